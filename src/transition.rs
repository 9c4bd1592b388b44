use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::model::{EntityKind, Status};

/// Outbound transitions an operator may take from `from`. This is an
/// administrative override layer: no status is terminal, every entry has at
/// least one way out (rejected instructors can be re-approved, published
/// courses pulled back to draft, banned students unbanned).
pub fn allowed_targets(kind: EntityKind, from: Status) -> &'static [Status] {
    match kind {
        EntityKind::Students => match from {
            Status::Pending => &[Status::Active, Status::Banned],
            Status::Active => &[Status::Inactive, Status::Banned],
            Status::Inactive => &[Status::Active, Status::Banned],
            Status::Banned => &[Status::Active],
            _ => &[],
        },
        EntityKind::Instructors => match from {
            Status::Pending => &[Status::Active, Status::Rejected],
            Status::Active => &[Status::Suspended],
            Status::Suspended => &[Status::Active],
            Status::Rejected => &[Status::Active],
            _ => &[],
        },
        EntityKind::Courses => match from {
            Status::Draft => &[Status::Pending, Status::Published],
            Status::Pending => &[Status::Published, Status::Rejected],
            Status::Published => &[Status::Draft],
            Status::Rejected => &[Status::Pending, Status::Published],
            _ => &[],
        },
    }
}

pub fn is_allowed(kind: EntityKind, from: Status, to: Status) -> bool {
    allowed_targets(kind, from).contains(&to)
}

/// Operator-facing verb for a transition, used in confirmations, toasts and
/// the audit log line.
pub fn label_for(kind: EntityKind, from: Status, to: Status) -> &'static str {
    match (kind, from, to) {
        (EntityKind::Students, Status::Pending, Status::Active) => "approve",
        (EntityKind::Students, Status::Inactive, Status::Active) => "reactivate",
        (EntityKind::Students, Status::Banned, Status::Active) => "unban",
        (EntityKind::Students, _, Status::Inactive) => "deactivate",
        (EntityKind::Students, _, Status::Banned) => "ban",
        (EntityKind::Instructors, Status::Pending, Status::Active) => "approve",
        (EntityKind::Instructors, Status::Rejected, Status::Active) => "reapprove",
        (EntityKind::Instructors, Status::Suspended, Status::Active) => "reinstate",
        (EntityKind::Instructors, _, Status::Suspended) => "suspend",
        (EntityKind::Instructors, _, Status::Rejected) => "reject",
        (EntityKind::Courses, Status::Pending, Status::Published) => "approve",
        (EntityKind::Courses, _, Status::Published) => "publish",
        (EntityKind::Courses, Status::Published, Status::Draft) => "unpublish",
        (EntityKind::Courses, Status::Draft, Status::Pending) => "submit",
        (EntityKind::Courses, Status::Rejected, Status::Pending) => "resubmit",
        (EntityKind::Courses, _, Status::Rejected) => "reject",
        _ => "update",
    }
}

/// Time-boxed reversal token for the last confirmed transition. Tagged data
/// consumed by the undo handler, not a closure: whoever holds the current
/// console state decides what the undo means when it fires.
#[derive(Debug, Clone)]
pub struct PendingUndo {
    pub undo_id: String,
    pub record_id: String,
    pub previous_status: Status,
    pub expires_at: DateTime<Utc>,
}

impl PendingUndo {
    pub fn new(record_id: &str, previous_status: Status, window_ms: u64) -> Self {
        PendingUndo {
            undo_id: Uuid::new_v4().to_string(),
            record_id: record_id.to_string(),
            previous_status,
            expires_at: Utc::now() + Duration::milliseconds(window_ms as i64),
        }
    }

    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_a_way_out() {
        for kind in EntityKind::ALL {
            for status in kind.statuses() {
                assert!(
                    !allowed_targets(kind, *status).is_empty(),
                    "{} {} is terminal",
                    kind.as_str(),
                    status.as_str()
                );
            }
        }
    }

    #[test]
    fn targets_stay_inside_the_kind_status_set() {
        for kind in EntityKind::ALL {
            for status in kind.statuses() {
                for target in allowed_targets(kind, *status) {
                    assert!(kind.allows_status(*target));
                }
            }
        }
    }

    #[test]
    fn rejected_records_can_be_reapproved() {
        assert!(is_allowed(EntityKind::Instructors, Status::Rejected, Status::Active));
        assert!(is_allowed(EntityKind::Courses, Status::Rejected, Status::Published));
    }

    #[test]
    fn edges_not_in_the_table_are_refused() {
        assert!(!is_allowed(EntityKind::Students, Status::Active, Status::Pending));
        assert!(!is_allowed(EntityKind::Courses, Status::Published, Status::Rejected));
        // Statuses from another kind never validate.
        assert!(!is_allowed(EntityKind::Students, Status::Active, Status::Published));
    }

    #[test]
    fn labels_match_the_operator_vocabulary() {
        assert_eq!(label_for(EntityKind::Instructors, Status::Pending, Status::Active), "approve");
        assert_eq!(label_for(EntityKind::Students, Status::Banned, Status::Active), "unban");
        assert_eq!(label_for(EntityKind::Courses, Status::Published, Status::Draft), "unpublish");
        assert_eq!(label_for(EntityKind::Courses, Status::Pending, Status::Published), "approve");
    }

    #[test]
    fn undo_expiry_is_a_strict_cutoff() {
        let undo = PendingUndo::new("r1", Status::Pending, 50);
        assert!(!undo.expired(undo.expires_at));
        assert!(undo.expired(undo.expires_at + Duration::milliseconds(1)));
    }
}
