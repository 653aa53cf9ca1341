//! JSONL audit trail for configuration updates.
//!
//! Every update attempt leaves a line per pipeline step:
//!
//! | `type`               | When                                        |
//! |----------------------|---------------------------------------------|
//! | `delta_built`        | read-set and write-set computed             |
//! | `quorum_met`         | the collector handed off a signed update    |
//! | `collection_expired` | the deadline passed with signers outstanding |
//! | `envelope_submitted` | signed envelope sent for ordering           |
//! | `update_rejected`    | the ordering service refused the envelope   |
//! | `update_committed`   | the new config sequence was accepted        |
//!
//! Every record carries the `update` id so the lines of one update can be
//! grouped, plus an RFC 3339 `timestamp` in UTC with millisecond precision.
//! A stale-version rebuild opens a new update, so one proposal may span
//! several ids.
//!
//! The file is never truncated. Successive runs append to the same trail and
//! records are flushed as they are written, so a crash loses at most the
//! line being written.

use chanconf_application::{AuditEvent, AuditLogger};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Append-only audit trail writer.
///
/// Concurrent pipelines may share one logger; the writer lock keeps each
/// record on its own line.
pub struct JsonlAuditLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlAuditLogger {
    /// Open the trail at `path` for appending, creating it and its parent
    /// directories on first use.
    ///
    /// Returns `None` if the file cannot be opened. Updates are not blocked
    /// on the audit trail; the caller runs without one.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create audit log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open audit log {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLogger for JsonlAuditLogger {
    fn log(&self, event: AuditEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let record = if let serde_json::Value::Object(mut map) = event.payload {
            map.insert(
                "type".to_string(),
                serde_json::Value::String(event.event_type.to_string()),
            );
            map.insert(
                "timestamp".to_string(),
                serde_json::Value::String(timestamp),
            );
            serde_json::Value::Object(map)
        } else {
            serde_json::json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": event.payload,
            })
        };

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                warn!("Could not write audit record to {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for JsonlAuditLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
