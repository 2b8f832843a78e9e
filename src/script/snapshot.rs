//! Versioned JSON snapshot of a finished run.
//!
//! Written next to the run log with the same stem and a `.json` extension.

use super::run::RunMode;
use crate::error::AppResult;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::Path;

/// Bumped whenever a field changes meaning.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// What a run looked like when it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Format version for compatibility checking
    pub format_version: u32,
    /// Script class name
    pub class: String,
    /// Log directory name of the run
    pub run_name: String,
    /// Entry point that started the run
    pub mode: RunMode,
    /// Local time the run started
    pub started: NaiveDateTime,
    /// Keyword arguments the run was started with
    pub arguments: Map<String, Json>,
    /// False when the constructor body returned an error
    pub succeeded: bool,
    /// Rendered error when the constructor body failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The script object's serialized state at exit
    pub state: Json,
}

impl RunSnapshot {
    /// Write as pretty JSON, replacing any file at `path`.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "Wrote run snapshot");
        Ok(())
    }

    /// Read a snapshot written by [`RunSnapshot::save`].
    pub fn load(path: &Path) -> AppResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("[10h 00m 00s].json");
        let started = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();

        let snapshot = RunSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            class: "Pipeline".into(),
            run_name: "pipeline".into(),
            mode: RunMode::Gui,
            started,
            arguments: json!({"run_mode": "gui"}).as_object().cloned().unwrap(),
            succeeded: false,
            error: Some("boom".into()),
            state: json!({"count": 2}),
        };
        snapshot.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"format_version\": 1"));
        assert_eq!(RunSnapshot::load(&path).unwrap(), snapshot);
    }
}
