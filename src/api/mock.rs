use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{BulkOutcome, ImportSummary, Page, PlatformStats, RemoteApi, RemoteError};
use crate::csvio::ImportRow;
use crate::model::{BulkActionKind, EntityKind, Record, Status};
use crate::view::{self, ViewParameters};

/// In-memory platform API used by development sessions and the integration
/// suite. Paginates with the same pure pipeline the consoles use, injects
/// per-call latency, and can be told to fail the next call of a given
/// operation once.
pub struct MockApi {
    inner: Mutex<MockInner>,
}

struct MockInner {
    records: HashMap<EntityKind, Vec<Record>>,
    latency_ms: u64,
    fail_next: Vec<String>,
}

impl MockApi {
    pub fn new(records: HashMap<EntityKind, Vec<Record>>) -> Self {
        MockApi {
            inner: Mutex::new(MockInner {
                records,
                latency_ms: 0,
                fail_next: Vec::new(),
            }),
        }
    }

    pub fn configure(&self, latency_ms: Option<u64>, fail_next: Option<Vec<String>>) {
        let mut inner = self.inner.lock();
        if let Some(ms) = latency_ms {
            inner.latency_ms = ms;
        }
        if let Some(ops) = fail_next {
            inner.fail_next.extend(ops);
        }
    }

    /// Latency first, then the injected failure, so a scripted rejection
    /// still arrives as slowly as a real one would.
    async fn gate(&self, op: &str) -> Result<(), RemoteError> {
        let (latency_ms, fail) = {
            let mut inner = self.inner.lock();
            let fail = match inner.fail_next.iter().position(|f| f == op) {
                Some(idx) => {
                    inner.fail_next.remove(idx);
                    true
                }
                None => false,
            };
            (inner.latency_ms, fail)
        };
        if latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(latency_ms)).await;
        }
        if fail {
            return Err(RemoteError::new(format!("injected failure for {op}")));
        }
        Ok(())
    }
}

impl RemoteApi for MockApi {
    async fn list_records(
        &self,
        kind: EntityKind,
        params: &ViewParameters,
    ) -> Result<Page, RemoteError> {
        self.gate("listRecords").await?;
        let inner = self.inner.lock();
        let records = inner.records.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let derived = view::derive(kind, records, params);
        Ok(Page {
            data: derived.slice,
            total_pages: derived.total_pages,
        })
    }

    async fn update_status(
        &self,
        kind: EntityKind,
        id: &str,
        status: Status,
    ) -> Result<(), RemoteError> {
        self.gate("updateStatus").await?;
        if !kind.allows_status(status) {
            return Err(RemoteError::new(format!(
                "{} records cannot be {}",
                kind.as_str(),
                status.as_str()
            )));
        }
        let mut inner = self.inner.lock();
        let records = inner.records.entry(kind).or_default();
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.status = status;
                Ok(())
            }
            None => Err(RemoteError::new(format!("unknown record id {id}"))),
        }
    }

    async fn delete_record(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError> {
        self.gate("deleteRecord").await?;
        let mut inner = self.inner.lock();
        let records = inner.records.entry(kind).or_default();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(RemoteError::new(format!("unknown record id {id}")));
        }
        Ok(())
    }

    async fn bulk_action(
        &self,
        kind: EntityKind,
        ids: &[String],
        action: BulkActionKind,
    ) -> Result<BulkOutcome, RemoteError> {
        self.gate("bulkAction").await?;
        let mut inner = self.inner.lock();
        let records = inner.records.entry(kind).or_default();

        // All-or-nothing: validate the whole batch before touching anything.
        for id in ids {
            if !records.iter().any(|r| &r.id == id) {
                return Err(RemoteError::new(format!("unknown record id {id}")));
            }
        }

        match action {
            BulkActionKind::Delete => {
                records.retain(|r| !ids.contains(&r.id));
            }
            BulkActionKind::Export => {
                return Err(RemoteError::new("export never reaches the platform API"));
            }
            _ => {
                let Some(target) = action.target_status(kind) else {
                    return Err(RemoteError::new(format!(
                        "{} is not a status action",
                        action.as_str()
                    )));
                };
                for record in records.iter_mut().filter(|r| ids.contains(&r.id)) {
                    record.status = target;
                }
            }
        }

        Ok(BulkOutcome {
            message: format!("{} applied to {} records", action.as_str(), ids.len()),
        })
    }

    async fn batch_create(
        &self,
        kind: EntityKind,
        rows: &[ImportRow],
    ) -> Result<ImportSummary, RemoteError> {
        self.gate("batchCreate").await?;
        let mut inner = self.inner.lock();
        let records = inner.records.entry(kind).or_default();
        let mut created = 0usize;
        let mut skipped = 0usize;
        for row in rows {
            // Server-side validation the client deliberately leaves to us.
            if !row.email.contains('@') || records.iter().any(|r| r.email.as_deref() == Some(row.email.as_str())) {
                skipped += 1;
                continue;
            }
            records.push(Record {
                id: Uuid::new_v4().to_string(),
                name: row.name.clone(),
                status: kind.default_status(),
                email: Some(row.email.clone()),
                instructor_name: None,
                description: None,
                category: None,
                rating: None,
                students: None,
                courses: None,
                revenue: None,
                created_at: Utc::now(),
                last_active_at: None,
            });
            created += 1;
        }
        Ok(ImportSummary {
            message: format!("created {created} accounts, skipped {skipped}"),
            created,
        })
    }

    async fn get_stats(&self, kind: EntityKind) -> Result<PlatformStats, RemoteError> {
        self.gate("getStats").await?;
        let inner = self.inner.lock();
        let records = inner.records.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let by_status = kind
            .statuses()
            .iter()
            .map(|s| (*s, records.iter().filter(|r| r.status == *s).count() as u64))
            .collect();
        Ok(PlatformStats {
            total: records.len() as u64,
            by_status,
            revenue: records.iter().filter_map(|r| r.revenue).sum(),
        })
    }
}

fn seed_time(day: i64) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    base + Duration::days(day)
}

/// Deterministic development data set: 25 students, 8 instructors,
/// 12 courses with a spread of statuses, categories and metrics.
pub fn sample_records() -> HashMap<EntityKind, Vec<Record>> {
    let mut out: HashMap<EntityKind, Vec<Record>> = HashMap::new();

    let student_statuses = [
        Status::Active,
        Status::Active,
        Status::Active,
        Status::Inactive,
        Status::Pending,
        Status::Active,
        Status::Banned,
    ];
    let students = (0..25)
        .map(|i| Record {
            id: format!("stu-{i:02}"),
            name: format!("Student {i:02}"),
            status: student_statuses[i % student_statuses.len()],
            email: Some(format!("student{i:02}@coursedesk.test")),
            instructor_name: None,
            description: None,
            category: None,
            rating: None,
            students: None,
            courses: Some((i % 4) as i64),
            revenue: None,
            created_at: seed_time(i as i64),
            last_active_at: Some(seed_time(i as i64 + 30)),
        })
        .collect();
    out.insert(EntityKind::Students, students);

    let instructor_statuses = [
        Status::Active,
        Status::Pending,
        Status::Active,
        Status::Suspended,
        Status::Active,
        Status::Rejected,
        Status::Active,
        Status::Pending,
    ];
    let instructor_names = [
        "Dana Wu",
        "Leo Marsh",
        "Priya Nair",
        "Tom Okafor",
        "Mina Sato",
        "Jon Reyes",
        "Ana Petrova",
        "Sam Diallo",
    ];
    let instructors = (0..8)
        .map(|i| Record {
            id: format!("ins-{i:02}"),
            name: instructor_names[i].to_string(),
            status: instructor_statuses[i],
            email: Some(format!("instructor{i:02}@coursedesk.test")),
            instructor_name: None,
            description: None,
            category: None,
            rating: Some(3.6 + (i as f64) * 0.15),
            students: Some(40 + (i as i64) * 25),
            courses: Some(1 + (i as i64 % 4)),
            revenue: Some(900.0 + (i as f64) * 450.0),
            created_at: seed_time(i as i64 * 3),
            last_active_at: Some(seed_time(i as i64 * 3 + 40)),
        })
        .collect();
    out.insert(EntityKind::Instructors, instructors);

    let course_statuses = [
        Status::Published,
        Status::Pending,
        Status::Published,
        Status::Draft,
        Status::Published,
        Status::Rejected,
    ];
    let categories = ["development", "design", "business", "science"];
    let course_names = [
        "Rust for Web Services",
        "Figma Fundamentals",
        "Bookkeeping Basics",
        "Intro to Astronomy",
        "Async Programming",
        "Brand Identity Studio",
        "Startup Finance",
        "Organic Chemistry",
        "Systems Design",
        "Typography Workshop",
        "Negotiation Skills",
        "Marine Biology",
    ];
    let courses = (0..12)
        .map(|i| Record {
            id: format!("crs-{i:02}"),
            name: course_names[i].to_string(),
            status: course_statuses[i % course_statuses.len()],
            email: None,
            instructor_name: Some(instructor_names[i % instructor_names.len()].to_string()),
            description: Some(format!("{} with projects and graded labs", course_names[i])),
            category: Some(categories[i % categories.len()].to_string()),
            rating: Some(3.2 + (i as f64) * 0.12),
            students: Some(15 + (i as i64) * 9),
            courses: None,
            revenue: Some(240.0 + (i as f64) * 180.0),
            created_at: seed_time(i as i64 * 5),
            last_active_at: None,
        })
        .collect();
    out.insert(EntityKind::Courses, courses);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_statuses_stay_inside_each_kind() {
        for (kind, records) in sample_records() {
            for r in &records {
                assert!(kind.allows_status(r.status), "{} has {}", r.id, r.status.as_str());
            }
        }
    }

    #[tokio::test]
    async fn list_paginates_with_the_shared_pipeline() {
        let api = MockApi::new(sample_records());
        let mut params = ViewParameters::new(10);
        params.page = 1;
        let page = api
            .list_records(EntityKind::Students, &params)
            .await
            .expect("list");
        assert_eq!(page.data.len(), 10);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn bulk_with_an_unknown_id_changes_nothing() {
        let api = MockApi::new(sample_records());
        let ids = vec!["stu-00".to_string(), "stu-xx".to_string()];
        let err = api
            .bulk_action(EntityKind::Students, &ids, BulkActionKind::Ban)
            .await
            .expect_err("unknown id");
        assert!(err.message.contains("stu-xx"));

        let params = ViewParameters::new(50);
        let page = api
            .list_records(EntityKind::Students, &params)
            .await
            .expect("list");
        let s0 = page.data.iter().find(|r| r.id == "stu-00").expect("stu-00");
        assert_ne!(s0.status, Status::Banned);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let api = MockApi::new(sample_records());
        api.configure(None, Some(vec!["updateStatus".to_string()]));
        let err = api
            .update_status(EntityKind::Students, "stu-00", Status::Banned)
            .await
            .expect_err("injected");
        assert!(err.message.contains("injected"));
        api.update_status(EntityKind::Students, "stu-00", Status::Banned)
            .await
            .expect("second call passes");
    }

    #[tokio::test]
    async fn batch_create_skips_bad_emails_and_duplicates() {
        let api = MockApi::new(HashMap::new());
        let rows = vec![
            ImportRow {
                name: "Ada".into(),
                email: "ada@x.com".into(),
                password: "pw".into(),
                phone: None,
            },
            ImportRow {
                name: "NoAt".into(),
                email: "not-an-email".into(),
                password: "pw".into(),
                phone: None,
            },
            ImportRow {
                name: "Ada Again".into(),
                email: "ada@x.com".into(),
                password: "pw".into(),
                phone: None,
            },
        ];
        let summary = api
            .batch_create(EntityKind::Students, &rows)
            .await
            .expect("create");
        assert_eq!(summary.created, 1);
        assert!(summary.message.contains("skipped 2"));
    }
}
