use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::api::{mock, Backend, MockApi};
use crate::errors::EngineError;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::types::{Request, SharedState};
use crate::model::{EntityKind, Record};

fn handle_health(state: &SharedState, req: &Request) -> serde_json::Value {
    let app = state.lock();
    let consoles: Vec<&str> = app.consoles.keys().map(|k| k.as_str()).collect();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "connected": app.backend.is_some(),
            "consoles": consoles,
        }),
    )
}

/// `session.connect` is how the shell binds the sidecar to a backend, the
/// way a workspace picker binds an editor to a folder. Only the in-memory
/// transport exists today; it also carries the test tuning knobs.
fn handle_session_connect(state: &SharedState, req: &Request) -> Result<serde_json::Value, EngineError> {
    let transport = req
        .params
        .get("transport")
        .and_then(|v| v.as_str())
        .unwrap_or("mock");
    if transport != "mock" {
        return Err(EngineError::bad_params(format!(
            "unsupported transport: {transport}"
        )));
    }

    let records = parse_seed(req.params.get("seed"))?;
    let seeded: serde_json::Value = {
        let mut m = serde_json::Map::new();
        for kind in EntityKind::ALL {
            let n = records.get(&kind).map(Vec::len).unwrap_or(0);
            m.insert(kind.as_str().to_string(), json!(n));
        }
        serde_json::Value::Object(m)
    };

    let api = MockApi::new(records);
    api.configure(
        req.params.get("latencyMs").and_then(|v| v.as_u64()),
        parse_fail_next(req.params.get("failNext"))?,
    );

    let page_size = match req.params.get("defaultPageSize").and_then(|v| v.as_u64()) {
        Some(size) if size == 0 || size > 100 => {
            return Err(EngineError::bad_params("defaultPageSize must be 1..=100"));
        }
        other => other,
    };

    let mut app = state.lock();
    if let Some(ms) = req.params.get("undoWindowMs").and_then(|v| v.as_u64()) {
        app.config.undo_window_ms = ms;
    }
    if let Some(size) = page_size {
        app.config.default_page_size = size as u32;
    }
    app.backend = Some(Arc::new(Backend::Mock(api)));
    // A new session invalidates every open console and its in-flight calls.
    app.consoles.clear();

    info!(transport, "session connected");
    Ok(ok(&req.id, json!({ "transport": transport, "seeded": seeded })))
}

/// Mid-session tuning of the in-memory backend (latency, one-shot failures).
/// Tests use this to script a rollback after an otherwise healthy setup.
fn handle_mock_configure(state: &SharedState, req: &Request) -> Result<serde_json::Value, EngineError> {
    let backend = {
        let app = state.lock();
        app.backend()?
    };
    let Backend::Mock(api) = backend.as_ref();
    api.configure(
        req.params.get("latencyMs").and_then(|v| v.as_u64()),
        parse_fail_next(req.params.get("failNext"))?,
    );
    Ok(ok(&req.id, json!({ "applied": true })))
}

fn parse_seed(
    seed: Option<&serde_json::Value>,
) -> Result<HashMap<EntityKind, Vec<Record>>, EngineError> {
    match seed {
        None => Ok(HashMap::new()),
        Some(serde_json::Value::String(s)) if s == "sample" => Ok(mock::sample_records()),
        Some(serde_json::Value::String(s)) => {
            Err(EngineError::bad_params(format!("unknown seed preset: {s}")))
        }
        Some(value) => {
            let mut out = HashMap::new();
            for kind in EntityKind::ALL {
                let Some(list) = value.get(kind.as_str()) else {
                    continue;
                };
                let records: Vec<Record> = serde_json::from_value(list.clone())
                    .map_err(|e| EngineError::bad_params(format!("bad seed records: {e}")))?;
                for r in &records {
                    if !kind.allows_status(r.status) {
                        return Err(EngineError::bad_params(format!(
                            "seed record {} has status {} outside the {} set",
                            r.id,
                            r.status.as_str(),
                            kind.as_str()
                        )));
                    }
                }
                out.insert(kind, records);
            }
            Ok(out)
        }
    }
}

fn parse_fail_next(
    value: Option<&serde_json::Value>,
) -> Result<Option<Vec<String>>, EngineError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let list = value
        .as_array()
        .ok_or_else(|| EngineError::bad_params("failNext must be an array of operation names"))?;
    let ops = list
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| EngineError::bad_params("failNext entries must be strings"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(ops))
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.connect" => {
            Some(handle_session_connect(state, req).unwrap_or_else(|e| engine_err(&req.id, e)))
        }
        "mock.configure" => {
            Some(handle_mock_configure(state, req).unwrap_or_else(|e| engine_err(&req.id, e)))
        }
        _ => None,
    }
}
