use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::api::Backend;
use crate::config::Config;
use crate::console::ConsoleState;
use crate::errors::EngineError;
use crate::model::EntityKind;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub backend: Option<Arc<Backend>>,
    pub consoles: HashMap<EntityKind, ConsoleState>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config,
            backend: None,
            consoles: HashMap::new(),
        }
    }

    pub fn backend(&self) -> Result<Arc<Backend>, EngineError> {
        self.backend
            .clone()
            .ok_or_else(|| EngineError::validation("no_session", "connect a session first"))
    }

    pub fn console_mut(&mut self, kind: EntityKind) -> Result<&mut ConsoleState, EngineError> {
        self.consoles.get_mut(&kind).ok_or_else(|| {
            EngineError::validation(
                "console_not_open",
                format!("open the {} console first", kind.as_str()),
            )
        })
    }
}

/// All handlers share state through this handle. Lock scopes never span an
/// await; remote calls run against a cloned backend Arc.
pub type SharedState = Arc<Mutex<AppState>>;
