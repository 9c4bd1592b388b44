use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{kind_param, require_confirmation, str_param};
use crate::api::RemoteApi;
use crate::errors::EngineError;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::types::{Request, SharedState};
use crate::model::Status;
use crate::transition::{self, PendingUndo};

/// Single-record status transition: confirmation gate, table check,
/// optimistic apply, remote call, then either an undo token or a rollback.
async fn handle_update_status(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    let id = str_param(&req.params, "id")?.to_string();
    let raw = str_param(&req.params, "status")?;
    let status = Status::parse(raw)
        .filter(|s| kind.allows_status(*s))
        .ok_or_else(|| {
            EngineError::bad_params(format!("unknown {} status: {raw}", kind.as_str()))
        })?;
    require_confirmation(&req.params)?;

    let (backend, previous, label, undo_window_ms) = {
        let mut app = state.lock();
        let backend = app.backend()?;
        let undo_window_ms = app.config.undo_window_ms;
        let console = app.console_mut(kind)?;
        let Some(record) = console.record(&id) else {
            return Err(EngineError::validation(
                "not_found",
                format!("no record {id} on the current page"),
            ));
        };
        let previous = record.status;
        if previous == status {
            // Already there: report a no-op, and leave any live undo alone.
            return Ok(ok(&req.id, json!({ "noop": true, "status": status.as_str() })));
        }
        if console.is_busy(&id) {
            return Err(EngineError::validation(
                "transition_in_flight",
                format!("record {id} already has a call in flight"),
            ));
        }
        if !transition::is_allowed(kind, previous, status) {
            return Err(EngineError::validation(
                "bad_transition",
                format!(
                    "{} -> {} is not an operator transition for {}",
                    previous.as_str(),
                    status.as_str(),
                    kind.as_str()
                ),
            ));
        }
        let label = transition::label_for(kind, previous, status);
        if let Some(record) = console.record_mut(&id) {
            record.status = status;
        }
        console.begin_call(&id);
        (backend, previous, label, undo_window_ms)
    };

    let outcome = backend.update_status(kind, &id, status).await;

    let mut app = state.lock();
    let Some(console) = app.consoles.get_mut(&kind) else {
        // Console closed while the call was out; the outcome has no home.
        return Err(EngineError::Stale);
    };
    console.end_call(&id);
    match outcome {
        Ok(()) => {
            if let Some(record) = console.record_mut(&id) {
                record.status = status;
            }
            let undo = PendingUndo::new(&id, previous, undo_window_ms);
            let result = json!({
                "status": status.as_str(),
                "label": label,
                "undoId": undo.undo_id,
                "undoExpiresAt": undo.expires_at.to_rfc3339(),
            });
            // One live token per console: a newer transition replaces it.
            console.pending_undo = Some(undo);
            info!(kind = kind.as_str(), id = %id, label, "status updated");
            Ok(ok(&req.id, result))
        }
        Err(e) => {
            if let Some(record) = console.record_mut(&id) {
                if record.status == status {
                    record.status = previous;
                }
            }
            warn!(kind = kind.as_str(), id = %id, error = %e, "status update failed, rolled back");
            Err(EngineError::Remote(e))
        }
    }
}

/// Consume the live undo token. Skips the confirmation gate and the
/// transition table: it restores a factual prior state. Expired, unknown or
/// orphaned tokens are inert.
async fn handle_undo(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    let undo_id = str_param(&req.params, "undoId")?;

    let expired = |id: &str| Ok(ok(id, json!({ "expired": true })));

    let (backend, record_id, restore_to, undone_from) = {
        let mut app = state.lock();
        let backend = app.backend()?;
        let console = app.console_mut(kind)?;
        let Some(pending) = console.pending_undo.clone() else {
            return expired(&req.id);
        };
        if pending.undo_id != undo_id {
            return expired(&req.id);
        }
        if pending.expired(Utc::now()) {
            console.pending_undo = None;
            return expired(&req.id);
        }
        let Some(record) = console.record(&pending.record_id) else {
            // The record left the page (deleted or re-queried away).
            console.pending_undo = None;
            return expired(&req.id);
        };
        if console.is_busy(&pending.record_id) {
            return Err(EngineError::validation(
                "transition_in_flight",
                format!("record {} already has a call in flight", pending.record_id),
            ));
        }
        let undone_from = record.status;
        console.pending_undo = None; // one-shot
        let record_id = pending.record_id.clone();
        if let Some(record) = console.record_mut(&record_id) {
            record.status = pending.previous_status;
        }
        console.begin_call(&record_id);
        (backend, record_id, pending.previous_status, undone_from)
    };

    let outcome = backend.update_status(kind, &record_id, restore_to).await;

    let mut app = state.lock();
    let Some(console) = app.consoles.get_mut(&kind) else {
        return Err(EngineError::Stale);
    };
    console.end_call(&record_id);
    match outcome {
        Ok(()) => {
            if let Some(record) = console.record_mut(&record_id) {
                record.status = restore_to;
            }
            info!(kind = kind.as_str(), id = %record_id, "transition undone");
            Ok(ok(
                &req.id,
                json!({ "undone": true, "status": restore_to.as_str() }),
            ))
        }
        Err(e) => {
            if let Some(record) = console.record_mut(&record_id) {
                if record.status == restore_to {
                    record.status = undone_from;
                }
            }
            warn!(kind = kind.as_str(), id = %record_id, error = %e, "undo failed, rolled back");
            Err(EngineError::Remote(e))
        }
    }
}

/// Confirmed hard delete. Deletion is the one event that prunes the
/// selection; nothing is applied optimistically, the row disappears only
/// after the remote call lands.
async fn handle_delete(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    let id = str_param(&req.params, "id")?.to_string();
    require_confirmation(&req.params)?;

    let backend = {
        let mut app = state.lock();
        let backend = app.backend()?;
        let console = app.console_mut(kind)?;
        if console.record(&id).is_none() {
            return Err(EngineError::validation(
                "not_found",
                format!("no record {id} on the current page"),
            ));
        }
        if console.is_busy(&id) {
            return Err(EngineError::validation(
                "transition_in_flight",
                format!("record {id} already has a call in flight"),
            ));
        }
        console.begin_call(&id);
        backend
    };

    let outcome = backend.delete_record(kind, &id).await;

    let mut app = state.lock();
    let Some(console) = app.consoles.get_mut(&kind) else {
        return Err(EngineError::Stale);
    };
    console.end_call(&id);
    match outcome {
        Ok(()) => {
            console.prune_deleted(&id);
            info!(kind = kind.as_str(), id = %id, "record deleted");
            Ok(ok(&req.id, json!({ "deleted": true })))
        }
        Err(e) => {
            warn!(kind = kind.as_str(), id = %id, error = %e, "delete failed");
            Err(EngineError::Remote(e))
        }
    }
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "records.updateStatus" => handle_update_status(state, req).await,
        "records.undo" => handle_undo(state, req).await,
        "records.delete" => handle_delete(state, req).await,
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| engine_err(&req.id, e)))
}
