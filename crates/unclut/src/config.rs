//! Settings store: a TOML file under `~/.unclut`, overridable from the environment.

use crate::error::ConfigError;
use shared_types::{ActionPreference, Settings, Theme};
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".unclut";
const CONFIG_FILE: &str = "config.toml";

/// Keys accepted by `settings set`
pub const SETTING_KEYS: &[&str] = &[
    "action",
    "max_senders",
    "max_emails_to_scan",
    "confirm",
    "theme",
    "dry_run",
    "user_id",
];

/// Default location of the settings file (`~/.unclut/config.toml`)
pub fn default_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Use the explicit path when given, otherwise the default location
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_path(),
    }
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the whole record, creating parent directories as needed
pub fn save(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(settings)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("Saved settings to {}", path.display());
    Ok(())
}

/// Overwrite the file with the defaults. Works on an unreadable file too.
pub fn reset(path: &Path) -> Result<Settings, ConfigError> {
    let settings = Settings::default();
    save(path, &settings)?;
    Ok(settings)
}

/// Change one key in the stored file, leaving environment overrides out of
/// it. A file that no longer parses is replaced, starting from the defaults.
pub fn set_value(path: &Path, key: &str, value: &str) -> Result<Settings, ConfigError> {
    let mut stored = match load(path) {
        Ok(stored) => stored,
        Err(e @ ConfigError::Parse { .. }) => {
            tracing::warn!("{}; starting from defaults", e);
            Settings::default()
        }
        Err(e) => return Err(e),
    };

    set_field(&mut stored, key, value)?;
    save(path, &stored)?;
    Ok(stored)
}

/// Apply environment overrides from the process environment
pub fn apply_env(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Apply overrides from any key lookup. Values that fail to parse keep the
/// current setting.
pub fn apply_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("MAX_SENDERS") {
        match value.trim().parse() {
            Ok(n) => settings.max_senders = n,
            Err(_) => tracing::warn!("Ignoring invalid MAX_SENDERS value '{}'", value),
        }
    }

    if let Some(value) = lookup("MAX_EMAILS_TO_SCAN") {
        match value.trim().parse() {
            Ok(n) => settings.max_emails_to_scan = n,
            Err(_) => tracing::warn!("Ignoring invalid MAX_EMAILS_TO_SCAN value '{}'", value),
        }
    }

    if let Some(value) = lookup("DRY_RUN") {
        settings.dry_run = is_truthy(&value);
    }

    if let Some(value) = lookup("USER_ID") {
        let value = value.trim();
        if !value.is_empty() {
            settings.user_id = value.to_string();
        }
    }

    if let Some(value) = lookup("UNCLUT_ACTION") {
        match value.parse::<ActionPreference>() {
            Ok(action) => settings.action = action,
            Err(e) => tracing::warn!("Ignoring UNCLUT_ACTION: {}", e),
        }
    }

    if let Some(value) = lookup("UNCLUT_THEME") {
        match value.parse::<Theme>() {
            Ok(theme) => settings.theme = theme,
            Err(e) => tracing::warn!("Ignoring UNCLUT_THEME: {}", e),
        }
    }

    if let Some(value) = lookup("UNCLUT_CONFIRM") {
        settings.confirm = is_truthy(&value);
    }
}

/// Environment-style boolean: `true|1|t|y|yes`, anything else is false
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "t" | "y" | "yes"
    )
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "t" | "y" | "yes" | "on" => Ok(true),
        "false" | "0" | "f" | "n" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(key, value, "expected true or false")),
    }
}

fn parse_count(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::invalid_value(key, value, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::invalid_value(key, value, "expected a number")),
    }
}

/// Update a single field by key name
pub fn set_field(settings: &mut Settings, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "action" => {
            settings.action = value
                .parse()
                .map_err(|e: shared_types::ParseEnumError| {
                    ConfigError::invalid_value(key, value, e.to_string())
                })?
        }
        "max_senders" => settings.max_senders = parse_count(key, value)?,
        "max_emails_to_scan" => settings.max_emails_to_scan = parse_count(key, value)?,
        "confirm" => settings.confirm = parse_bool(key, value)?,
        "theme" => {
            settings.theme = value
                .parse()
                .map_err(|e: shared_types::ParseEnumError| {
                    ConfigError::invalid_value(key, value, e.to_string())
                })?
        }
        "dry_run" => settings.dry_run = parse_bool(key, value)?,
        "user_id" => {
            let value = value.trim();
            if value.is_empty() {
                return Err(ConfigError::invalid_value(key, value, "must not be empty"));
            }
            settings.user_id = value.to_string();
        }
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    }

    Ok(())
}
