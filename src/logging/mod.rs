//! Flow event log: one JSON line per controller flow.
//!
//! Every predict / clear / refresh flow appends its outcome so failures can
//! be traced after the fact. Defects (malformed snapshots, missing chart
//! slots) land here with their full message.
//!
//! Log file: `~/.classboard/events.jsonl` unless `[logging] path` is set.
//! Writing is best-effort; a failure to log never affects a flow.

use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;
use crate::error::DashboardError;

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEvent {
    pub timestamp: String,
    /// `predict`, `clear` or `refresh`.
    pub flow: String,
    /// `ok`, `cancelled`, `coalesced`, or an error kind tag.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

impl FlowEvent {
    pub fn new(flow: &str, outcome: &str, detail: Option<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            flow: flow.to_string(),
            outcome: outcome.to_string(),
            detail,
        }
    }

    pub fn failure(flow: &str, error: &DashboardError) -> Self {
        Self::new(flow, error.kind(), Some(error.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Where flow events go.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// A log that discards everything.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        if config.path.is_empty() {
            Self {
                path: default_log_path(),
            }
        } else {
            Self::at(&config.path)
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn record(&self, event: &FlowEvent) {
        let _ = self.append(event);
    }

    fn append(&self, event: &FlowEvent) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(event)?;
        writeln!(file, "{json}")?;

        Ok(())
    }
}

fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".classboard").join("events.jsonl"))
}
