use serde_json::{json, Value};
use tracing::info;

use super::{console, kind_param, stats, str_param};
use crate::api::RemoteApi;
use crate::csvio;
use crate::errors::EngineError;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::types::{Request, SharedState};
use crate::model::EntityKind;

/// Tolerant CSV import: parse locally, drop malformed rows silently, refuse
/// to call out with nothing valid, then hand the server one batched create
/// and surface its summary verbatim.
async fn handle_import_csv(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    if kind != EntityKind::Students {
        return Err(EngineError::bad_params(
            "csv import creates student accounts only",
        ));
    }
    let text = str_param(&req.params, "text")?;

    let parsed = csvio::parse_import(text);
    if parsed.rows.is_empty() {
        return Err(EngineError::validation(
            "no_valid_rows",
            "no valid data rows in import",
        ));
    }

    let backend = {
        let mut app = state.lock();
        let max = app.config.max_import_rows;
        if parsed.rows.len() > max {
            return Err(EngineError::validation(
                "too_many_rows",
                format!("import exceeds {max} rows"),
            ));
        }
        let backend = app.backend()?;
        app.console_mut(kind)?;
        backend
    };

    let summary = backend.batch_create(kind, &parsed.rows).await?;
    info!(created = summary.created, parsed = parsed.rows.len(), "csv import submitted");

    // New accounts change both the page and the authoritative counters.
    let reload = console::query_console(state, kind).await?;
    let platform = {
        let backend = state.lock().backend()?;
        backend.get_stats(kind).await?
    };

    Ok(ok(
        &req.id,
        json!({
            "message": summary.message,
            "created": summary.created,
            "parsed": parsed.rows.len(),
            "discarded": parsed.discarded,
            "reload": reload,
            "stats": stats::stats_json(&platform),
        }),
    ))
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.importCsv" => {
            Some(handle_import_csv(state, req).await.unwrap_or_else(|e| engine_err(&req.id, e)))
        }
        _ => None,
    }
}
