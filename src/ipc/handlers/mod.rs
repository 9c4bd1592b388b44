pub mod bulk;
pub mod console;
pub mod core;
pub mod import;
pub mod records;
pub mod stats;

use crate::errors::EngineError;
use crate::model::EntityKind;

/// Shared param plumbing. Handlers validate everything before touching state;
/// a missing or malformed field is a ValidationError, never a panic.
pub(crate) fn kind_param(params: &serde_json::Value) -> Result<EntityKind, EngineError> {
    let raw = params
        .get("kind")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EngineError::bad_params("missing params.kind"))?;
    EntityKind::parse(raw)
        .ok_or_else(|| EngineError::bad_params(format!("unknown kind: {raw}")))
}

pub(crate) fn str_param<'a>(
    params: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, EngineError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::bad_params(format!("missing params.{key}")))
}

/// The confirmation gate of every mutating operation. The shell asks the
/// operator; we refuse to act unless it says so explicitly.
pub(crate) fn require_confirmation(params: &serde_json::Value) -> Result<(), EngineError> {
    let confirmed = params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if confirmed {
        Ok(())
    } else {
        Err(EngineError::validation(
            "confirmation_required",
            "operation requires operator confirmation",
        ))
    }
}
