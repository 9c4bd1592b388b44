use serde::Serialize;

use crate::model::Record;

/// One parsed account row from an import payload. Created at parse time,
/// promoted into the batch-create request or discarded; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRow {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportParse {
    pub rows: Vec<ImportRow>,
    /// Data lines dropped for a field-count mismatch or an empty name/email.
    pub discarded: usize,
}

/// Tolerant parse of pasted or uploaded CSV. The first line is the header
/// (lower-cased, trimmed, any column order); rows whose field count differs
/// from the header are dropped silently, as are rows with an empty name or
/// email. Email syntax is the batch-create call's problem, not ours.
pub fn parse_import(text: &str) -> ImportParse {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(|f| f.trim().to_lowercase()).collect(),
        Err(_) => {
            return ImportParse {
                rows: Vec::new(),
                discarded: 0,
            }
        }
    };
    let col = |name: &str| headers.iter().position(|h| h == name);
    let name_col = col("name");
    let email_col = col("email");
    let password_col = col("password");
    let phone_col = col("phone");

    let field = |rec: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| rec.get(i))
            .map(|f| f.trim().to_string())
            .unwrap_or_default()
    };

    let mut rows = Vec::new();
    let mut discarded = 0usize;
    for rec in reader.records() {
        let Ok(rec) = rec else {
            discarded += 1;
            continue;
        };
        if rec.len() != headers.len() {
            discarded += 1;
            continue;
        }
        let name = field(&rec, name_col);
        let email = field(&rec, email_col);
        if name.is_empty() || email.is_empty() {
            discarded += 1;
            continue;
        }
        let phone = field(&rec, phone_col);
        rows.push(ImportRow {
            name,
            email,
            password: field(&rec, password_col),
            phone: (!phone.is_empty()).then_some(phone),
        });
    }

    ImportParse { rows, discarded }
}

/// Serialize selected records to CSV for the bulk `export` action. Stays on
/// the client side of the service boundary.
pub fn write_export(records: &[&Record]) -> String {
    let mut w = csv::Writer::from_writer(Vec::new());
    let _ = w.write_record([
        "id",
        "name",
        "email",
        "status",
        "category",
        "rating",
        "students",
        "revenue",
        "createdAt",
    ]);
    for r in records {
        let _ = w.write_record([
            r.id.as_str(),
            r.name.as_str(),
            r.email.as_deref().unwrap_or(""),
            r.status.as_str(),
            r.category.as_deref().unwrap_or(""),
            &r.rating.map(|v| v.to_string()).unwrap_or_default(),
            &r.students.map(|v| v.to_string()).unwrap_or_default(),
            &r.revenue.map(|v| v.to_string()).unwrap_or_default(),
            &r.created_at.to_rfc3339(),
        ]);
    }
    String::from_utf8(w.into_inner().unwrap_or_default()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_valid_rows_and_drops_empty_names() {
        let text = "name,email,password\nAda,ada@x.com,pw1\n,bad,pw2\nBob,bob@x.com,pw3";
        let parsed = parse_import(text);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.discarded, 1);
        assert_eq!(parsed.rows[0].name, "Ada");
        assert_eq!(parsed.rows[1].email, "bob@x.com");
    }

    #[test]
    fn field_count_mismatch_drops_the_row_not_the_batch() {
        let text = "name,email,password\nAda,ada@x.com,pw1\nBob,bob@x.com\nCleo,cleo@x.com,pw3";
        let parsed = parse_import(text);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.discarded, 1);
    }

    #[test]
    fn header_order_does_not_matter() {
        let text = "email, Password ,name\nada@x.com,pw1,Ada";
        let parsed = parse_import(text);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].name, "Ada");
        assert_eq!(parsed.rows[0].password, "pw1");
    }

    #[test]
    fn phone_is_optional_and_trimmed() {
        let text = "name,email,password,phone\nAda,ada@x.com,pw1, 555-0100 \nBob,bob@x.com,pw2,";
        let parsed = parse_import(text);
        assert_eq!(parsed.rows[0].phone.as_deref(), Some("555-0100"));
        assert_eq!(parsed.rows[1].phone, None);
    }

    #[test]
    fn empty_and_header_only_input_yield_no_rows() {
        assert!(parse_import("").rows.is_empty());
        assert!(parse_import("name,email,password").rows.is_empty());
    }

    #[test]
    fn export_includes_a_row_per_record() {
        use crate::model::Status;
        use chrono::{TimeZone, Utc};
        let rec = Record {
            id: "c1".to_string(),
            name: "Algebra".to_string(),
            status: Status::Published,
            email: None,
            instructor_name: None,
            description: None,
            category: Some("math".to_string()),
            rating: Some(4.5),
            students: Some(120),
            courses: None,
            revenue: Some(1999.5),
            created_at: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            last_active_at: None,
        };
        let out = write_export(&[&rec]);
        let mut lines = out.lines();
        assert!(lines.next().unwrap_or("").starts_with("id,name,email,status"));
        let row = lines.next().unwrap_or("");
        assert!(row.contains("Algebra"));
        assert!(row.contains("published"));
        assert!(row.contains("4.5"));
    }
}
