/// Configuration system for classboard.
///
/// Layers, lowest precedence first:
///
/// 1. **Built-in defaults**: [`schema::ClassboardConfig::default()`]
/// 2. **User global config**: `~/.classboard/config.toml`
/// 3. **Project local config**: `.classboard.toml` in the current directory
/// 4. **Environment variables**: `CLASSBOARD_*`
///
/// File layers merge at the key level: a file that only sets
/// `service.timeout_ms` leaves every other value from the layer below it.
/// Unreadable or malformed files, and files holding a value of the wrong
/// type, are skipped as a whole; the other layers still apply.
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::ClassboardConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
pub fn load() -> ClassboardConfig {
    let files: Vec<PathBuf> = [global_config_path(), project_config_path()]
        .into_iter()
        .flatten()
        .collect();
    let mut config = load_layers(&files);
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Merge the given TOML files, in order, over the built-in defaults.
pub fn load_layers(files: &[PathBuf]) -> ClassboardConfig {
    let mut merged = match toml::Value::try_from(ClassboardConfig::default()) {
        Ok(value) => value,
        Err(_) => return ClassboardConfig::default(),
    };

    let mut config = ClassboardConfig::default();
    for path in files {
        let Some(layer) = read_toml_value(path) else {
            continue;
        };
        // A layer with a wrongly-typed value is dropped on its own.
        let mut candidate = merged.clone();
        merge_values(&mut candidate, layer);
        let resolved: std::result::Result<ClassboardConfig, _> = candidate.clone().try_into();
        if let Ok(resolved) = resolved {
            merged = candidate;
            config = resolved;
        }
    }

    config
}

fn read_toml_value(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Recursively overwrite keys in `base` with those present in `overlay`.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".classboard").join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".classboard.toml"))
}

/// Path to the global config file, for display and init.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Path to the project config file, for display.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply `CLASSBOARD_*` overrides using `lookup` to read variables.
///
/// - `CLASSBOARD_URL`: service base URL
/// - `CLASSBOARD_TIMEOUT_MS`: request timeout
/// - `CLASSBOARD_MODEL`: default model
/// - `CLASSBOARD_LOG`: event log on/off
pub fn apply_overrides(config: &mut ClassboardConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("CLASSBOARD_URL")
        && !val.is_empty()
    {
        config.service.base_url = val;
    }
    if let Some(val) = lookup("CLASSBOARD_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.service.timeout_ms = ms;
    }
    if let Some(val) = lookup("CLASSBOARD_MODEL")
        && !val.is_empty()
    {
        config.models.default = val;
    }
    if let Some(val) = lookup("CLASSBOARD_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / show
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.classboard/config.toml`.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    init_config_at(&path, force)?;
    Ok(path)
}

/// Write the annotated default config to `path`. Refuses to overwrite an
/// existing file unless `force` is set.
pub fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, ClassboardConfig::default_toml()).context("failed to write config file")
}

/// Set a dotted key (e.g. `service.base_url`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

/// Set a dotted key in the config file at `path`, creating it from defaults
/// when missing.
pub fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config file")?
    } else {
        toml::Value::try_from(ClassboardConfig::default())
            .context("failed to serialize default config")?
    };

    set_toml_value(&mut root, key, value)?;

    // Reject edits that would leave the file unloadable.
    let _: ClassboardConfig = root
        .clone()
        .try_into()
        .with_context(|| format!("'{value}' is not a valid value for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    let text = toml::to_string_pretty(&root).context("failed to serialize config")?;
    fs::write(path, text).context("failed to write config file")
}

/// Replace the leaf at a dotted key, parsing `raw_value` as the type of the
/// value it replaces.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let (section_path, leaf) = key
        .rsplit_once('.')
        .with_context(|| format!("config key must be 'section.key', got '{key}'"))?;

    let mut current = root;
    for part in section_path.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("unknown config section '{part}' in '{key}'"))?;
    }
    let table = current
        .as_table_mut()
        .with_context(|| format!("'{section_path}' is not a section"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => toml::Value::Integer(
            raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?,
        ),
        Some(toml::Value::Array(_)) => toml::Value::Array(
            raw_value
                .split(',')
                .map(|s| toml::Value::String(s.trim().to_string()))
                .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
                .collect(),
        ),
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// The effective configuration as TOML.
pub fn show_effective_config() -> Result<String> {
    toml::to_string_pretty(&load()).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
