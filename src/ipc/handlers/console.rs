use serde_json::{json, Value};

use super::{kind_param, str_param};
use crate::api::RemoteApi;
use crate::console::ConsoleState;
use crate::errors::EngineError;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::types::{Request, SharedState};
use crate::model::{EntityKind, Status};
use crate::stats;
use crate::view::{self, SortKey, ViewParameters};

/// Fetch the current page for a console and apply it, unless the console
/// moved on while the call was in flight. Every (re)query bumps the console
/// generation first; a response carrying an older generation is dropped.
/// When the requested page proves to be past the end, clamp and fetch again.
pub(crate) async fn query_console(
    state: &SharedState,
    kind: EntityKind,
) -> Result<Value, EngineError> {
    let (backend, generation, mut params) = {
        let mut app = state.lock();
        let backend = app.backend()?;
        let console = app.console_mut(kind)?;
        let generation = console.bump();
        (backend, generation, console.params.clone())
    };

    let mut attempts = 0;
    loop {
        let page = backend.list_records(kind, &params).await?;
        attempts += 1;
        let clamped = view::clamped_page(params.page, page.total_pages);
        if clamped != params.page && attempts < 3 {
            params.page = clamped;
            continue;
        }

        let mut app = state.lock();
        let Some(console) = app.consoles.get_mut(&kind) else {
            return Err(EngineError::Stale);
        };
        if console.generation != generation {
            return Err(EngineError::Stale);
        }
        console.params = params;
        console.apply_page(page);
        return Ok(page_json(console));
    }
}

pub(crate) fn page_json(console: &ConsoleState) -> Value {
    json!({
        "records": serde_json::to_value(&console.records).unwrap_or_else(|_| json!([])),
        "page": console.params.page,
        "totalPages": console.total_pages,
        "params": params_json(&console.params),
        "visibleCounts": stats::status_counts(console.kind, &console.records),
    })
}

fn params_json(params: &ViewParameters) -> Value {
    let mut out = json!({
        "searchText": params.search_text,
        "status": params.status_filter.map(|s| s.as_str()).unwrap_or("all"),
        "category": params.category_filter.as_deref().unwrap_or("all"),
        "sort": params.sort_key.as_str(),
        "page": params.page,
        "pageSize": params.page_size,
    });
    if let Some(from) = params.date_from {
        out["dateFrom"] = json!(from.format("%Y-%m-%d").to_string());
    }
    if let Some(to) = params.date_to {
        out["dateTo"] = json!(to.format("%Y-%m-%d").to_string());
    }
    out
}

fn apply_params_patch(
    kind: EntityKind,
    params: &mut ViewParameters,
    patch: &Value,
) -> Result<(), EngineError> {
    if let Some(v) = patch.get("searchText") {
        params.search_text = v
            .as_str()
            .ok_or_else(|| EngineError::bad_params("searchText must be a string"))?
            .to_string();
    }
    if let Some(v) = patch.get("status") {
        let raw = v
            .as_str()
            .ok_or_else(|| EngineError::bad_params("status must be a string"))?;
        params.status_filter = if raw == "all" {
            None
        } else {
            let status = Status::parse(raw)
                .filter(|s| kind.allows_status(*s))
                .ok_or_else(|| {
                    EngineError::bad_params(format!(
                        "unknown {} status: {raw}",
                        kind.as_str()
                    ))
                })?;
            Some(status)
        };
    }
    if let Some(v) = patch.get("category") {
        let raw = v
            .as_str()
            .ok_or_else(|| EngineError::bad_params("category must be a string"))?;
        params.category_filter = (raw != "all" && !raw.is_empty()).then(|| raw.to_string());
    }
    if let Some(v) = patch.get("sort") {
        let raw = v
            .as_str()
            .ok_or_else(|| EngineError::bad_params("sort must be a string"))?;
        params.sort_key = SortKey::parse(raw)
            .ok_or_else(|| EngineError::bad_params(format!("unknown sort key: {raw}")))?;
    }
    if let Some(v) = patch.get("page") {
        let page = v
            .as_u64()
            .filter(|p| *p >= 1)
            .ok_or_else(|| EngineError::bad_params("page must be a positive integer"))?;
        params.page = page.min(u32::MAX as u64) as u32;
    }
    if let Some(v) = patch.get("pageSize") {
        let size = v
            .as_u64()
            .filter(|s| (1..=100).contains(s))
            .ok_or_else(|| EngineError::bad_params("pageSize must be 1..=100"))?;
        params.page_size = size as u32;
    }
    for (key, slot) in [("dateFrom", 0usize), ("dateTo", 1usize)] {
        let Some(v) = patch.get(key) else { continue };
        let parsed = match v {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(
                chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| EngineError::bad_params(format!("{key} must be YYYY-MM-DD")))?,
            ),
            _ => return Err(EngineError::bad_params(format!("{key} must be a string"))),
        };
        if slot == 0 {
            params.date_from = parsed;
        } else {
            params.date_to = parsed;
        }
    }
    Ok(())
}

async fn handle_open(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    {
        let mut app = state.lock();
        app.backend()?;
        let mut console = ConsoleState::new(kind, app.config.default_page_size);
        if let Some(v) = req.params.get("pageSize") {
            let size = v
                .as_u64()
                .filter(|s| (1..=100).contains(s))
                .ok_or_else(|| EngineError::bad_params("pageSize must be 1..=100"))?;
            console.params.page_size = size as u32;
        }
        // Re-opening resets params, selection and any undo token.
        app.consoles.insert(kind, console);
    }

    let page = query_console(state, kind).await?;
    let platform = {
        let backend = state.lock().backend()?;
        backend.get_stats(kind).await?
    };
    let mut result = page;
    result["stats"] = super::stats::stats_json(&platform);
    Ok(ok(&req.id, result))
}

async fn handle_params_set(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    {
        let mut app = state.lock();
        let console = app.console_mut(kind)?;
        apply_params_patch(kind, &mut console.params, &req.params)?;
    }
    let page = query_console(state, kind).await?;
    Ok(ok(&req.id, page))
}

async fn handle_refresh(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    {
        let mut app = state.lock();
        app.console_mut(kind)?;
    }
    let page = query_console(state, kind).await?;
    let platform = {
        let backend = state.lock().backend()?;
        backend.get_stats(kind).await?
    };
    let mut result = page;
    result["stats"] = super::stats::stats_json(&platform);
    Ok(ok(&req.id, result))
}

fn handle_close(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    let mut app = state.lock();
    let existed = app.consoles.remove(&kind).is_some();
    Ok(ok(&req.id, json!({ "closed": existed })))
}

fn handle_selection_set(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    let ids = req
        .params
        .get("ids")
        .and_then(|v| v.as_array())
        .ok_or_else(|| EngineError::bad_params("missing params.ids"))?;
    let ids: Vec<String> = ids
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| EngineError::bad_params("ids must be strings"))
        })
        .collect::<Result<_, _>>()?;

    let mut app = state.lock();
    let console = app.console_mut(kind)?;
    console.selection = ids.into_iter().collect();
    Ok(ok(&req.id, json!({ "selected": console.selection.len() })))
}

fn handle_selection_toggle(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    let id = str_param(&req.params, "id")?.to_string();

    let mut app = state.lock();
    let console = app.console_mut(kind)?;
    if !console.selection.remove(&id) {
        console.selection.insert(id);
    }
    Ok(ok(&req.id, json!({ "selected": console.selection.len() })))
}

fn handle_selection_clear(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    let mut app = state.lock();
    let console = app.console_mut(kind)?;
    console.selection.clear();
    Ok(ok(&req.id, json!({ "selected": 0 })))
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "console.open" => handle_open(state, req).await,
        "console.params.set" => handle_params_set(state, req).await,
        "console.refresh" => handle_refresh(state, req).await,
        "console.close" => handle_close(state, req),
        "selection.set" => handle_selection_set(state, req),
        "selection.toggle" => handle_selection_toggle(state, req),
        "selection.clear" => handle_selection_clear(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| engine_err(&req.id, e)))
}
