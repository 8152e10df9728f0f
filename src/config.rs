use std::collections::HashMap;
use std::path::PathBuf;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Workspace opened before the first request, if set.
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct StartupError {
    pub code: &'static str,
    pub message: String,
}

impl DaemonConfig {
    pub fn load() -> Result<Self, StartupError> {
        let kv: HashMap<String, String> = std::env::vars().collect();
        Self::from_kv(&kv)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, StartupError> {
        let workspace = match kv.get("PHOTOBOARDD_WORKSPACE").map(|s| s.trim()) {
            None | Some("") => None,
            Some(p) => {
                let path = PathBuf::from(p);
                if path.is_file() {
                    return Err(StartupError {
                        code: "ERR_CONFIG_WORKSPACE",
                        message: format!("PHOTOBOARDD_WORKSPACE points at a file: {}", p),
                    });
                }
                Some(path)
            }
        };

        let log_filter = kv
            .get("PHOTOBOARDD_LOG")
            .or_else(|| kv.get("RUST_LOG"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            workspace,
            log_filter,
        })
    }
}
