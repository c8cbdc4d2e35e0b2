/// Configuration schema and defaults.
///
/// Sections: `[service]`, `[models]`, `[logging]`. Every field has a
/// built-in default, so a config file only needs the keys it changes.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassboardConfig {
    pub service: ServiceConfig,
    pub models: ModelsConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [service]
// ---------------------------------------------------------------------------

/// Where the prediction service lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; endpoint paths (`/api/...`) are appended to it.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [models]
// ---------------------------------------------------------------------------

/// The known model identifiers the service accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub available: Vec<String>,
    /// Used when a prediction does not name a model.
    pub default: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            available: vec!["logistic_regression".to_string(), "naive_bayes".to_string()],
            default: "logistic_regression".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Event log file. Empty means `~/.classboard/events.jsonl`.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: String::new(),
        }
    }
}

impl ClassboardConfig {
    /// Annotated default config written by `classboard config init`.
    pub fn default_toml() -> &'static str {
        r#"# classboard configuration
#
# Precedence (highest last): built-in defaults, ~/.classboard/config.toml,
# .classboard.toml in the working directory, CLASSBOARD_* environment variables.

[service]
# Prediction service base URL (CLASSBOARD_URL)
base_url = "http://127.0.0.1:5000"
# Per-request timeout in milliseconds (CLASSBOARD_TIMEOUT_MS)
timeout_ms = 10000

[models]
# Model identifiers the service accepts
available = ["logistic_regression", "naive_bayes"]
# Model used when none is given (CLASSBOARD_MODEL)
default = "logistic_regression"

[logging]
# Append flow events to a JSONL file (CLASSBOARD_LOG)
enabled = true
# Empty = ~/.classboard/events.jsonl
path = ""
"#
    }
}
