use std::collections::HashSet;

use crate::api::Page;
use crate::model::{EntityKind, Record};
use crate::transition::PendingUndo;
use crate::view::ViewParameters;

/// Everything one console instance owns: the query knobs, the cached page,
/// the cross-page selection, the single live undo token, and the guards that
/// keep overlapping remote calls honest. One of these exists per open entity
/// kind; nothing else writes to the cache.
pub struct ConsoleState {
    pub kind: EntityKind,
    pub params: ViewParameters,
    pub records: Vec<Record>,
    pub total_pages: u32,
    pub loaded: bool,
    pub selection: HashSet<String>,
    pub pending_undo: Option<PendingUndo>,
    /// Record ids with an individual status/delete call in flight.
    inflight: HashSet<String>,
    /// Ids covered by an in-flight bulk action, if any.
    bulk_inflight: Option<HashSet<String>>,
    /// Bumped by every (re)query; fetches that return under an older value
    /// are discarded instead of clobbering newer state.
    pub generation: u64,
}

impl ConsoleState {
    pub fn new(kind: EntityKind, page_size: u32) -> Self {
        ConsoleState {
            kind,
            params: ViewParameters::new(page_size),
            records: Vec::new(),
            total_pages: 1,
            loaded: false,
            selection: HashSet::new(),
            pending_undo: None,
            inflight: HashSet::new(),
            bulk_inflight: None,
            generation: 0,
        }
    }

    pub fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn apply_page(&mut self, page: Page) {
        self.records = page.data;
        self.total_pages = page.total_pages.max(1);
        self.loaded = true;
    }

    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn record_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// A record is busy while it has its own call in flight or a bulk action
    /// covering it; busy records refuse further transitions.
    pub fn is_busy(&self, id: &str) -> bool {
        self.inflight.contains(id)
            || self
                .bulk_inflight
                .as_ref()
                .is_some_and(|ids| ids.contains(id))
    }

    pub fn begin_call(&mut self, id: &str) {
        self.inflight.insert(id.to_string());
    }

    pub fn end_call(&mut self, id: &str) {
        self.inflight.remove(id);
    }

    pub fn any_inflight_in(&self, ids: &HashSet<String>) -> bool {
        ids.iter().any(|id| self.inflight.contains(id))
    }

    pub fn bulk_in_flight(&self) -> bool {
        self.bulk_inflight.is_some()
    }

    pub fn begin_bulk(&mut self, ids: HashSet<String>) {
        self.bulk_inflight = Some(ids);
    }

    pub fn end_bulk(&mut self) {
        self.bulk_inflight = None;
    }

    /// Deletion is the one event that prunes the selection; filters and page
    /// moves keep cross-page selections alive.
    pub fn prune_deleted(&mut self, id: &str) {
        self.records.retain(|r| r.id != id);
        self.selection.remove(id);
        if self
            .pending_undo
            .as_ref()
            .is_some_and(|u| u.record_id == id)
        {
            self.pending_undo = None;
        }
    }
}
