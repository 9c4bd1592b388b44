use serde_json::{json, Value};

use super::kind_param;
use crate::api::{PlatformStats, RemoteApi};
use crate::errors::EngineError;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::types::{Request, SharedState};
use crate::model::EntityKind;
use crate::stats;

pub(crate) fn stats_json(platform: &PlatformStats) -> Value {
    let mut by_status = serde_json::Map::new();
    for (status, count) in &platform.by_status {
        by_status.insert(status.as_str().to_string(), json!(count));
    }
    json!({
        "total": platform.total,
        "byStatus": by_status,
        "revenue": platform.revenue,
    })
}

/// Authoritative numbers come from the stats endpoint; the cached page only
/// ever contributes the clearly-labeled visible-page counts.
async fn handle_stats_get(state: &SharedState, req: &Request) -> Result<Value, EngineError> {
    let kind = kind_param(&req.params)?;
    let backend = {
        let app = state.lock();
        app.backend()?
    };
    let platform = backend.get_stats(kind).await?;

    let visible = {
        let app = state.lock();
        app.consoles
            .get(&kind)
            .filter(|c| c.loaded)
            .map(|c| stats::status_counts(kind, &c.records))
    };

    Ok(ok(
        &req.id,
        json!({
            "platform": stats_json(&platform),
            "visiblePage": visible,
        }),
    ))
}

/// Operator headline numbers for the dashboard, assembled from the per-kind
/// stats endpoints. Revenue is the course catalog's number; instructor
/// payouts are a view of the same money, not additional revenue.
async fn handle_dashboard_overview(
    state: &SharedState,
    req: &Request,
) -> Result<Value, EngineError> {
    let backend = {
        let app = state.lock();
        app.backend()?
    };

    let mut kinds = serde_json::Map::new();
    let mut records_total = 0u64;
    let mut revenue = 0.0f64;
    for kind in EntityKind::ALL {
        let platform = backend.get_stats(kind).await?;
        records_total += platform.total;
        if kind == EntityKind::Courses {
            revenue = platform.revenue;
        }
        kinds.insert(kind.as_str().to_string(), stats_json(&platform));
    }

    Ok(ok(
        &req.id,
        json!({
            "kinds": kinds,
            "totals": { "records": records_total, "revenue": revenue },
        }),
    ))
}

pub async fn try_handle(state: &SharedState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "stats.get" => handle_stats_get(state, req).await,
        "dashboard.overview" => handle_dashboard_overview(state, req).await,
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| engine_err(&req.id, e)))
}
