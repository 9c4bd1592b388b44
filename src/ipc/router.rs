use super::handlers;
use super::types::{Request, SharedState};
use crate::ipc::error::err;

pub async fn handle_request(state: SharedState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(&state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::console::try_handle(&state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::records::try_handle(&state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::bulk::try_handle(&state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::import::try_handle(&state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::stats::try_handle(&state, &req).await {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
