//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
///
/// ```toml
/// [logging]
/// audit_log = "~/.local/share/chanconf/audit.jsonl"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file receiving one record per pipeline event
    pub audit_log: Option<PathBuf>,
}

impl FileLoggingConfig {
    /// Audit log path with a leading `~` expanded to the home directory
    pub fn audit_log_path(&self) -> Option<PathBuf> {
        let path = self.audit_log.as_ref()?;
        match path.strip_prefix("~") {
            Ok(rest) => dirs::home_dir().map(|home| home.join(rest)),
            Err(_) => Some(path.clone()),
        }
    }
}
