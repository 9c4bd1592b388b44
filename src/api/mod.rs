pub mod mock;

use thiserror::Error;

use crate::csvio::ImportRow;
use crate::model::{BulkActionKind, EntityKind, Record, Status};
use crate::view::ViewParameters;

pub use mock::MockApi;

/// One page of a collection as the platform API reports it. `total_pages` is
/// the server's number; the sidecar clamps its own page against it.
#[derive(Debug, Clone)]
pub struct Page {
    pub data: Vec<Record>,
    pub total_pages: u32,
}

#[derive(Debug, Clone)]
pub struct BulkOutcome {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub message: String,
    pub created: usize,
}

/// Authoritative collection-wide numbers from the stats endpoint. Never
/// derived from the locally cached page.
#[derive(Debug, Clone, Default)]
pub struct PlatformStats {
    pub total: u64,
    pub by_status: Vec<(Status, u64)>,
    pub revenue: f64,
}

/// Every remote rejection looks the same to the engine regardless of cause
/// (timeout, transport, server error); the caller always takes the rollback
/// path on `Err`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        RemoteError {
            message: message.into(),
        }
    }
}

/// The service boundary the engine is written against. Any transport that
/// satisfies these signatures is conformant; the sidecar ships an in-memory
/// implementation and the shell can wire a real one behind the same methods.
#[allow(async_fn_in_trait)]
pub trait RemoteApi {
    async fn list_records(
        &self,
        kind: EntityKind,
        params: &ViewParameters,
    ) -> Result<Page, RemoteError>;

    async fn update_status(
        &self,
        kind: EntityKind,
        id: &str,
        status: Status,
    ) -> Result<(), RemoteError>;

    async fn delete_record(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError>;

    async fn bulk_action(
        &self,
        kind: EntityKind,
        ids: &[String],
        action: BulkActionKind,
    ) -> Result<BulkOutcome, RemoteError>;

    async fn batch_create(
        &self,
        kind: EntityKind,
        rows: &[ImportRow],
    ) -> Result<ImportSummary, RemoteError>;

    async fn get_stats(&self, kind: EntityKind) -> Result<PlatformStats, RemoteError>;
}

/// Concrete transports, dispatched without trait objects. `mock` is the only
/// backend today; a network transport would be a second arm.
pub enum Backend {
    Mock(MockApi),
}

impl RemoteApi for Backend {
    async fn list_records(
        &self,
        kind: EntityKind,
        params: &ViewParameters,
    ) -> Result<Page, RemoteError> {
        match self {
            Backend::Mock(api) => api.list_records(kind, params).await,
        }
    }

    async fn update_status(
        &self,
        kind: EntityKind,
        id: &str,
        status: Status,
    ) -> Result<(), RemoteError> {
        match self {
            Backend::Mock(api) => api.update_status(kind, id, status).await,
        }
    }

    async fn delete_record(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError> {
        match self {
            Backend::Mock(api) => api.delete_record(kind, id).await,
        }
    }

    async fn bulk_action(
        &self,
        kind: EntityKind,
        ids: &[String],
        action: BulkActionKind,
    ) -> Result<BulkOutcome, RemoteError> {
        match self {
            Backend::Mock(api) => api.bulk_action(kind, ids, action).await,
        }
    }

    async fn batch_create(
        &self,
        kind: EntityKind,
        rows: &[ImportRow],
    ) -> Result<ImportSummary, RemoteError> {
        match self {
            Backend::Mock(api) => api.batch_create(kind, rows).await,
        }
    }

    async fn get_stats(&self, kind: EntityKind) -> Result<PlatformStats, RemoteError> {
        match self {
            Backend::Mock(api) => api.get_stats(kind).await,
        }
    }
}
