use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

/// One JSON line read from stdin. `params` is method-specific.
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The open photoboard workspace: its directory and the `photoboard.sqlite3` connection
/// holding courses, users, roles, sessions and settings. Both are `None` until
/// `workspace.select` (or `PHOTOBOARDD_WORKSPACE`) opens one.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}
