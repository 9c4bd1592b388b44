use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::model::{EntityKind, Record, Status};

/// User-controlled query knobs for one console. `status_filter` and
/// `category_filter` use `None` as the "all" sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParameters {
    pub search_text: String,
    pub status_filter: Option<Status>,
    pub category_filter: Option<String>,
    pub sort_key: SortKey,
    pub page: u32,
    pub page_size: u32,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ViewParameters {
    pub fn new(page_size: u32) -> Self {
        ViewParameters {
            search_text: String::new(),
            status_filter: None,
            category_filter: None,
            sort_key: SortKey::Newest,
            page: 1,
            page_size: page_size.max(1),
            date_from: None,
            date_to: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Newest,
    Oldest,
    NameAsc,
    NameDesc,
    Rating,
    Students,
    Revenue,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" => Some(SortKey::Newest),
            "oldest" => Some(SortKey::Oldest),
            "name_asc" => Some(SortKey::NameAsc),
            "name_desc" => Some(SortKey::NameDesc),
            "rating" => Some(SortKey::Rating),
            "students" => Some(SortKey::Students),
            "revenue" => Some(SortKey::Revenue),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
            SortKey::Rating => "rating",
            SortKey::Students => "students",
            SortKey::Revenue => "revenue",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Derived {
    pub slice: Vec<Record>,
    pub total_matching: usize,
    pub total_pages: u32,
}

/// The pure search → filter → sort → paginate chain. Order is fixed: filters
/// narrow before the sort decides tie-breaks, and pagination sees the final
/// ordering. No side effects; both the console path and the in-memory backend
/// paginate with this one function.
pub fn derive(kind: EntityKind, records: &[Record], params: &ViewParameters) -> Derived {
    let needle = params.search_text.trim().to_lowercase();
    let mut matched: Vec<&Record> = records
        .iter()
        .filter(|r| matches_search(kind, r, &needle))
        .filter(|r| params.status_filter.map_or(true, |want| r.status == want))
        .filter(|r| matches_category(r, params.category_filter.as_deref()))
        .filter(|r| matches_date_range(r, params.date_from, params.date_to))
        .collect();

    // Vec::sort_by is stable: equal keys keep their input order.
    matched.sort_by(|a, b| compare(a, b, params.sort_key));

    let total_matching = matched.len();
    let total_pages = pages_for(total_matching, params.page_size);
    let page_size = params.page_size.max(1) as usize;
    let start = params.page.max(1) as usize * page_size - page_size;
    let slice = if start >= total_matching {
        // A page past the end renders empty rather than erroring.
        Vec::new()
    } else {
        matched[start..(start + page_size).min(total_matching)]
            .iter()
            .map(|r| (*r).clone())
            .collect()
    };

    Derived {
        slice,
        total_matching,
        total_pages,
    }
}

/// `ceil(total / page_size)`, never less than 1 even for an empty set.
pub fn pages_for(total: usize, page_size: u32) -> u32 {
    let size = page_size.max(1) as usize;
    (total.div_ceil(size)).max(1) as u32
}

/// Clamp a requested page into `[1, total_pages]`.
pub fn clamped_page(requested: u32, total_pages: u32) -> u32 {
    requested.max(1).min(total_pages.max(1))
}

fn matches_search(kind: EntityKind, record: &Record, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let mut fields: [Option<&str>; 4] = [Some(record.name.as_str()), record.email.as_deref(), None, None];
    if kind == EntityKind::Courses {
        fields[2] = record.instructor_name.as_deref();
        fields[3] = record.description.as_deref();
    }
    fields
        .into_iter()
        .flatten()
        .any(|f| f.to_lowercase().contains(needle))
}

fn matches_category(record: &Record, filter: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(want) => record
            .category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(want)),
    }
}

fn matches_date_range(record: &Record, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    let created = record.created_at.date_naive();
    if let Some(from) = from {
        if created < from {
            return false;
        }
    }
    if let Some(to) = to {
        if created > to {
            return false;
        }
    }
    true
}

fn compare(a: &Record, b: &Record, key: SortKey) -> Ordering {
    match key {
        SortKey::Newest => b.created_at.cmp(&a.created_at),
        SortKey::Oldest => a.created_at.cmp(&b.created_at),
        SortKey::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
        // Metric keys sort descending; a missing metric counts as 0.
        SortKey::Rating => b
            .rating
            .unwrap_or(0.0)
            .total_cmp(&a.rating.unwrap_or(0.0)),
        SortKey::Students => b.students.unwrap_or(0).cmp(&a.students.unwrap_or(0)),
        SortKey::Revenue => b
            .revenue
            .unwrap_or(0.0)
            .total_cmp(&a.revenue.unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn student(id: &str, name: &str, status: Status, day_offset: i64) -> Record {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        Record {
            id: id.to_string(),
            name: name.to_string(),
            status,
            email: Some(format!("{}@example.edu", id)),
            instructor_name: None,
            description: None,
            category: None,
            rating: None,
            students: None,
            courses: None,
            revenue: None,
            created_at: base + chrono::Duration::days(day_offset),
            last_active_at: None,
        }
    }

    fn course(id: &str, name: &str, rating: f64, day_offset: i64) -> Record {
        let mut r = student(id, name, Status::Published, day_offset);
        r.email = None;
        r.instructor_name = Some("Dana Wu".to_string());
        r.description = Some("Intro lectures and labs".to_string());
        r.category = Some("science".to_string());
        r.rating = Some(rating);
        r
    }

    fn params(page: u32, page_size: u32) -> ViewParameters {
        let mut p = ViewParameters::new(page_size);
        p.page = page;
        p
    }

    #[test]
    fn banned_filter_paginates_to_two_pages() {
        // 25 students: 12 active, 13 banned.
        let mut records = Vec::new();
        for i in 0..12 {
            records.push(student(&format!("a{i}"), &format!("Active {i}"), Status::Active, i));
        }
        for i in 0..13 {
            records.push(student(&format!("b{i}"), &format!("Banned {i}"), Status::Banned, 20 + i));
        }

        let mut p = params(2, 10);
        p.status_filter = Some(Status::Banned);
        let out = derive(EntityKind::Students, &records, &p);
        assert_eq!(out.total_matching, 13);
        assert_eq!(out.total_pages, 2);
        assert_eq!(out.slice.len(), 3);
        assert!(out.slice.iter().all(|r| r.status == Status::Banned));
    }

    #[test]
    fn empty_set_still_reports_one_page() {
        let out = derive(EntityKind::Students, &[], &params(1, 10));
        assert_eq!(out.total_matching, 0);
        assert_eq!(out.total_pages, 1);
        assert!(out.slice.is_empty());
    }

    #[test]
    fn page_past_the_end_is_empty_not_an_error() {
        let records = vec![student("s1", "Solo", Status::Active, 0)];
        let out = derive(EntityKind::Students, &records, &params(9, 10));
        assert_eq!(out.total_matching, 1);
        assert!(out.slice.is_empty());
    }

    #[test]
    fn search_is_case_insensitive_and_spans_fields() {
        let records = vec![
            student("s1", "Ada Lovelace", Status::Active, 0),
            student("s2", "Bob Byte", Status::Active, 1),
        ];
        let mut p = params(1, 10);
        p.search_text = "LOVEL".to_string();
        assert_eq!(derive(EntityKind::Students, &records, &p).total_matching, 1);

        // Email matches too.
        p.search_text = "s2@example".to_string();
        assert_eq!(derive(EntityKind::Students, &records, &p).total_matching, 1);
    }

    #[test]
    fn course_search_covers_instructor_and_description() {
        let records = vec![course("c1", "Algebra", 4.5, 0), course("c2", "Pottery", 4.0, 1)];
        let mut p = params(1, 10);
        p.search_text = "dana".to_string();
        assert_eq!(derive(EntityKind::Courses, &records, &p).total_matching, 2);
        p.search_text = "labs".to_string();
        assert_eq!(derive(EntityKind::Courses, &records, &p).total_matching, 2);
        p.search_text = "pott".to_string();
        assert_eq!(derive(EntityKind::Courses, &records, &p).total_matching, 1);
    }

    #[test]
    fn category_filter_is_exact_and_all_is_none() {
        let mut art = course("c1", "Watercolors", 4.1, 0);
        art.category = Some("art".to_string());
        let records = vec![art, course("c2", "Physics", 4.7, 1)];
        let mut p = params(1, 10);
        p.category_filter = Some("art".to_string());
        let out = derive(EntityKind::Courses, &records, &p);
        assert_eq!(out.total_matching, 1);
        assert_eq!(out.slice[0].id, "c1");
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let records = vec![
            student("s1", "Early", Status::Active, 0),  // Jan 1
            student("s2", "Mid", Status::Active, 5),    // Jan 6
            student("s3", "Late", Status::Active, 10),  // Jan 11
        ];
        let mut p = params(1, 10);
        p.date_from = NaiveDate::from_ymd_opt(2025, 1, 6);
        p.date_to = NaiveDate::from_ymd_opt(2025, 1, 11);
        let out = derive(EntityKind::Students, &records, &p);
        assert_eq!(out.total_matching, 2);
        assert!(out.slice.iter().any(|r| r.id == "s2"));
        assert!(out.slice.iter().any(|r| r.id == "s3"));
    }

    #[test]
    fn metric_sort_is_descending_with_missing_as_zero() {
        let mut unrated = course("c3", "Unrated", 0.0, 2);
        unrated.rating = None;
        let records = vec![course("c1", "Mid", 3.0, 0), unrated, course("c2", "Top", 4.9, 1)];
        let mut p = params(1, 10);
        p.sort_key = SortKey::Rating;
        let out = derive(EntityKind::Courses, &records, &p);
        let ids: Vec<&str> = out.slice.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1", "c3"]);
    }

    #[test]
    fn equal_sort_keys_keep_input_order() {
        let records = vec![
            course("c1", "First", 4.0, 0),
            course("c2", "Second", 4.0, 1),
            course("c3", "Third", 4.0, 2),
        ];
        let mut p = params(1, 10);
        p.sort_key = SortKey::Rating;
        let out = derive(EntityKind::Courses, &records, &p);
        let ids: Vec<&str> = out.slice.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn clamped_page_stays_in_range() {
        assert_eq!(clamped_page(0, 4), 1);
        assert_eq!(clamped_page(3, 4), 3);
        assert_eq!(clamped_page(9, 4), 4);
        assert_eq!(clamped_page(9, 0), 1);
    }

    proptest! {
        #[test]
        fn slice_never_exceeds_page_size(
            statuses in proptest::collection::vec(0u8..4, 0..60),
            page in 1u32..8,
            page_size in 1u32..12,
        ) {
            let records: Vec<Record> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let status = EntityKind::Students.statuses()[*s as usize];
                    student(&format!("s{i}"), &format!("Student {i}"), status, i as i64)
                })
                .collect();
            let mut p = params(page, page_size);
            p.status_filter = Some(Status::Active);
            let out = derive(EntityKind::Students, &records, &p);
            prop_assert!(out.slice.len() <= page_size as usize);
            prop_assert!(out.total_pages >= 1);
        }

        #[test]
        fn paging_enumerates_every_match_exactly_once(
            statuses in proptest::collection::vec(0u8..4, 0..60),
            page_size in 1u32..12,
        ) {
            let records: Vec<Record> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let status = EntityKind::Students.statuses()[*s as usize];
                    student(&format!("s{i}"), &format!("Student {i}"), status, i as i64)
                })
                .collect();
            let mut p = params(1, page_size);
            p.status_filter = Some(Status::Banned);

            let first = derive(EntityKind::Students, &records, &p);
            let mut seen = Vec::new();
            for page in 1..=first.total_pages {
                p.page = page;
                let out = derive(EntityKind::Students, &records, &p);
                seen.extend(out.slice.iter().map(|r| r.id.clone()));
            }
            let mut expected: Vec<String> = records
                .iter()
                .filter(|r| r.status == Status::Banned)
                .map(|r| r.id.clone())
                .collect();
            seen.sort();
            expected.sort();
            prop_assert_eq!(seen, expected);
        }
    }
}
