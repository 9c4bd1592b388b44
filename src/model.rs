use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three record collections the admin shell manages. All engine state is
/// parameterized by kind through the descriptor methods below instead of
/// per-collection copies of the same logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Students,
    Instructors,
    Courses,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Students,
        EntityKind::Instructors,
        EntityKind::Courses,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "students" => Some(EntityKind::Students),
            "instructors" => Some(EntityKind::Instructors),
            "courses" => Some(EntityKind::Courses),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Students => "students",
            EntityKind::Instructors => "instructors",
            EntityKind::Courses => "courses",
        }
    }

    /// Closed status set for this kind. A record's status is always one of
    /// these; nothing in the sidecar ever invents a value outside the set.
    pub fn statuses(self) -> &'static [Status] {
        match self {
            EntityKind::Students => &[
                Status::Active,
                Status::Inactive,
                Status::Banned,
                Status::Pending,
            ],
            EntityKind::Instructors => &[
                Status::Pending,
                Status::Active,
                Status::Suspended,
                Status::Rejected,
            ],
            EntityKind::Courses => &[
                Status::Draft,
                Status::Pending,
                Status::Published,
                Status::Rejected,
            ],
        }
    }

    pub fn allows_status(self, status: Status) -> bool {
        self.statuses().contains(&status)
    }

    /// Status assigned to records created through the batch-create call.
    pub fn default_status(self) -> Status {
        match self {
            EntityKind::Students => Status::Active,
            EntityKind::Instructors => Status::Pending,
            EntityKind::Courses => Status::Pending,
        }
    }

    pub fn bulk_actions(self) -> &'static [BulkActionKind] {
        match self {
            EntityKind::Students => &[
                BulkActionKind::Activate,
                BulkActionKind::Deactivate,
                BulkActionKind::Ban,
                BulkActionKind::Delete,
                BulkActionKind::Export,
            ],
            EntityKind::Instructors => &[
                BulkActionKind::Approve,
                BulkActionKind::Reject,
                BulkActionKind::Suspend,
                BulkActionKind::Delete,
                BulkActionKind::Export,
            ],
            EntityKind::Courses => &[
                BulkActionKind::Publish,
                BulkActionKind::Unpublish,
                BulkActionKind::Reject,
                BulkActionKind::Delete,
                BulkActionKind::Export,
            ],
        }
    }
}

/// Union of the per-kind status vocabularies. Which subset applies is decided
/// by `EntityKind::statuses`; handlers validate with `allows_status` before
/// any value reaches the cache or the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
    Banned,
    Pending,
    Suspended,
    Rejected,
    Draft,
    Published,
}

impl Status {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Status::Active),
            "inactive" => Some(Status::Inactive),
            "banned" => Some(Status::Banned),
            "pending" => Some(Status::Pending),
            "suspended" => Some(Status::Suspended),
            "rejected" => Some(Status::Rejected),
            "draft" => Some(Status::Draft),
            "published" => Some(Status::Published),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Banned => "banned",
            Status::Pending => "pending",
            Status::Suspended => "suspended",
            Status::Rejected => "rejected",
            Status::Draft => "draft",
            Status::Published => "published",
        }
    }
}

/// One cached row of a collection. The platform API owns these; the sidecar
/// holds a possibly-stale copy of the current page per console. Fields that
/// only some kinds carry are optional and omitted from JSON when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Enrollment for courses, students taught for instructors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Operator vocabulary for `records.bulkAction`. `Export` never leaves the
/// sidecar; everything else maps onto one batched remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkActionKind {
    Activate,
    Deactivate,
    Ban,
    Approve,
    Reject,
    Suspend,
    Publish,
    Unpublish,
    Delete,
    Export,
}

impl BulkActionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "activate" => Some(BulkActionKind::Activate),
            "deactivate" => Some(BulkActionKind::Deactivate),
            "ban" => Some(BulkActionKind::Ban),
            "approve" => Some(BulkActionKind::Approve),
            "reject" => Some(BulkActionKind::Reject),
            "suspend" => Some(BulkActionKind::Suspend),
            "publish" => Some(BulkActionKind::Publish),
            "unpublish" => Some(BulkActionKind::Unpublish),
            "delete" => Some(BulkActionKind::Delete),
            "export" => Some(BulkActionKind::Export),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BulkActionKind::Activate => "activate",
            BulkActionKind::Deactivate => "deactivate",
            BulkActionKind::Ban => "ban",
            BulkActionKind::Approve => "approve",
            BulkActionKind::Reject => "reject",
            BulkActionKind::Suspend => "suspend",
            BulkActionKind::Publish => "publish",
            BulkActionKind::Unpublish => "unpublish",
            BulkActionKind::Delete => "delete",
            BulkActionKind::Export => "export",
        }
    }

    /// Target status a status-changing bulk action resolves to for `kind`.
    /// `Delete` and `Export` have no target.
    pub fn target_status(self, kind: EntityKind) -> Option<Status> {
        let status = match self {
            BulkActionKind::Activate => Status::Active,
            BulkActionKind::Deactivate => Status::Inactive,
            BulkActionKind::Ban => Status::Banned,
            BulkActionKind::Approve => match kind {
                EntityKind::Courses => Status::Published,
                _ => Status::Active,
            },
            BulkActionKind::Reject => Status::Rejected,
            BulkActionKind::Suspend => Status::Suspended,
            BulkActionKind::Publish => Status::Published,
            BulkActionKind::Unpublish => Status::Draft,
            BulkActionKind::Delete | BulkActionKind::Export => return None,
        };
        Some(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::parse("admins"), None);
    }

    #[test]
    fn status_sets_are_closed_per_kind() {
        assert!(EntityKind::Students.allows_status(Status::Banned));
        assert!(!EntityKind::Students.allows_status(Status::Published));
        assert!(EntityKind::Courses.allows_status(Status::Draft));
        assert!(!EntityKind::Courses.allows_status(Status::Banned));
        assert!(!EntityKind::Instructors.allows_status(Status::Inactive));
    }

    #[test]
    fn bulk_actions_resolve_to_statuses_the_kind_allows() {
        for kind in EntityKind::ALL {
            for action in kind.bulk_actions() {
                if let Some(target) = action.target_status(kind) {
                    assert!(
                        kind.allows_status(target),
                        "{} / {} resolves outside the status set",
                        kind.as_str(),
                        action.as_str()
                    );
                }
            }
        }
    }

    #[test]
    fn approve_is_publish_for_courses() {
        assert_eq!(
            BulkActionKind::Approve.target_status(EntityKind::Courses),
            Some(Status::Published)
        );
        assert_eq!(
            BulkActionKind::Approve.target_status(EntityKind::Instructors),
            Some(Status::Active)
        );
    }
}
