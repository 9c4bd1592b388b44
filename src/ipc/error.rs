use serde_json::json;

use crate::errors::EngineError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Uniform mapping from the engine taxonomy to the wire. Stale outcomes are
/// not errors: the UI drops them, so they answer `ok` with a marker and no
/// payload.
pub fn engine_err(id: &str, e: EngineError) -> serde_json::Value {
    match e {
        EngineError::Validation { code, message } => err(id, code, message, None),
        EngineError::Remote(remote) => err(
            id,
            "remote_failed",
            "remote call failed",
            Some(json!({ "message": remote.message })),
        ),
        EngineError::Stale => ok(id, json!({ "stale": true })),
    }
}
