use serde_json::{json, Value};

use crate::model::{EntityKind, Record};

/// Status counts over the records currently cached for a console. These are
/// visible-page numbers only: the sidecar holds one page, so authoritative
/// per-collection counts always come from the stats endpoint instead.
pub fn status_counts(kind: EntityKind, records: &[Record]) -> Value {
    let mut out = serde_json::Map::new();
    for status in kind.statuses() {
        let n = records.iter().filter(|r| r.status == *status).count();
        out.insert(status.as_str().to_string(), json!(n));
    }
    Value::Object(out)
}
