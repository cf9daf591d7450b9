use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::schedule::EditSession;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// An open editing session plus the delivery target it was opened for.
/// Both ids are opaque to the engine and only travel to the outbox.
pub struct SessionEntry {
    pub session: EditSession,
    pub schedule_id: Option<String>,
    pub email: Option<String>,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub sessions: HashMap<String, SessionEntry>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            sessions: HashMap::new(),
        }
    }
}
