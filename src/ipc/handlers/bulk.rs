use std::collections::HashSet;

use serde_json::{json, Value};
use tracing::{info, warn};

use super::{console, kind_param, require_confirmation, stats};
use crate::api::RemoteApi;
use crate::csvio;
use crate::errors::EngineError;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::types::{Request, SharedState};
use crate::model::BulkActionKind;

/// Apply one operator-chosen action to the whole selection. One batched
/// remote call, one success/failure signal: on failure nothing was touched,
/// on success the page and stats are reloaded wholesale instead of patched.
async fn handle_bulk_action(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;

    // Action and selection validate before the confirmation gate.
    let raw = req
        .params
        .get("action")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EngineError::validation("bad_action", "no bulk action selected"))?;
    let action = BulkActionKind::parse(raw)
        .filter(|a| kind.bulk_actions().contains(a))
        .ok_or_else(|| {
            EngineError::validation(
                "bad_action",
                format!("{raw} is not a bulk action for {}", kind.as_str()),
            )
        })?;

    let (backend, ids) = {
        let mut app = state.lock();
        let backend = app.backend()?;
        let console = app.console_mut(kind)?;
        if console.selection.is_empty() {
            return Err(EngineError::validation(
                "empty_selection",
                "select at least one record",
            ));
        }
        require_confirmation(&req.params)?;

        if action == BulkActionKind::Export {
            // Export stays on this side of the service boundary.
            let selected: Vec<_> = console
                .records
                .iter()
                .filter(|r| console.selection.contains(&r.id))
                .collect();
            let csv = csvio::write_export(&selected);
            return Ok(ok(
                &req.id,
                json!({
                    "action": "export",
                    "csv": csv,
                    "exported": selected.len(),
                    "notLoaded": console.selection.len() - selected.len(),
                }),
            ));
        }

        if console.bulk_in_flight() {
            return Err(EngineError::validation(
                "transition_in_flight",
                "another bulk action is in flight",
            ));
        }
        let ids: HashSet<String> = console.selection.clone();
        if console.any_inflight_in(&ids) {
            return Err(EngineError::validation(
                "transition_in_flight",
                "a selected record has an individual call in flight",
            ));
        }
        console.begin_bulk(ids.clone());
        (backend, ids)
    };

    let mut id_list: Vec<String> = ids.into_iter().collect();
    id_list.sort();
    let outcome = backend.bulk_action(kind, &id_list, action).await;

    let message = {
        let mut app = state.lock();
        let Some(console) = app.consoles.get_mut(&kind) else {
            return Err(EngineError::Stale);
        };
        console.end_bulk();
        match outcome {
            Ok(bulk) => {
                // Selection and the pending action choice reset together.
                console.selection.clear();
                if action == BulkActionKind::Delete {
                    console.pending_undo = None;
                }
                info!(kind = kind.as_str(), action = action.as_str(), count = id_list.len(), "bulk action applied");
                bulk.message
            }
            Err(e) => {
                warn!(kind = kind.as_str(), action = action.as_str(), error = %e, "bulk action failed");
                return Err(EngineError::Remote(e));
            }
        }
    };

    // Full reload rather than incremental reconciliation.
    let reload = console::query_console(state, kind).await?;
    let platform = {
        let backend = state.lock().backend()?;
        backend.get_stats(kind).await?
    };
    Ok(ok(
        &req.id,
        json!({
            "message": message,
            "reload": reload,
            "stats": stats::stats_json(&platform),
        }),
    ))
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.bulkAction" => {
            Some(handle_bulk_action(state, req).await.unwrap_or_else(|e| engine_err(&req.id, e)))
        }
        _ => None,
    }
}
