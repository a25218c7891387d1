//! The per-user configuration file, `~/.gatorconfig.json`.
//!
//! A missing file yields defaults, with the database placed next to the
//! config file. Unknown keys are accepted and logged. The whole file is
//! rewritten on every save.
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".gatorconfig.json";
const DEFAULT_DB_FILE_NAME: &str = ".gator.db";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("HOME environment variable not set")]
    MissingHome,

    /// Poll interval that is not a positive duration
    #[error("Invalid interval {0:?}: expected a positive duration such as 30s, 1m or 1h30m")]
    InvalidInterval(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Connection string, current user and fetch settings.
///
/// Field names match the on-disk JSON. `current_user_name` is an empty string
/// when nobody is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file path or `sqlite:` URL
    pub db_url: String,

    pub current_user_name: String,

    /// Deadline for one scheduled fetch, request and body together
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: String::new(),
            current_user_name: String::new(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// `$HOME/.gatorconfig.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHome)?;
        Ok(PathBuf::from(home).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a JSON file.
    ///
    /// - Missing or blank file → defaults
    /// - Missing `db_url` → `.gator.db` in the config file's directory
    /// - Invalid JSON → `Err(ConfigError::Parse)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        let content = match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Ok(_) => match std::fs::read_to_string(path) {
                Ok(c) => c,
                // deleted between metadata and read
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(ConfigError::Io(e)),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                String::new()
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let mut config = if content.trim().is_empty() {
            Self::default()
        } else {
            warn_unknown_keys(&content);
            serde_json::from_str::<Config>(&content)?
        };

        if config.db_url.trim().is_empty() {
            config.db_url = path
                .with_file_name(DEFAULT_DB_FILE_NAME)
                .to_string_lossy()
                .into_owned();
        }

        tracing::debug!(path = %path.display(), db_url = %config.db_url, "Loaded configuration");
        Ok(config)
    }

    /// Rewrite the whole file atomically (temp file in the same directory, then rename).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut content = serde_json::to_vec_pretty(self)?;
        content.push(b'\n');
        write_atomic(path, &content)
    }

    /// Record `name` as the current user and persist immediately.
    pub fn set_user(&mut self, name: &str, path: &Path) -> Result<(), ConfigError> {
        self.current_user_name = name.to_string();
        self.save(path)
    }

    /// The logged-in user name, if any
    pub fn current_user(&self) -> Option<&str> {
        Some(self.current_user_name.as_str()).filter(|name| !name.is_empty())
    }

    /// Per-fetch deadline; never zero.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

fn warn_unknown_keys(content: &str) {
    const KNOWN_KEYS: [&str; 3] = ["db_url", "current_user_name", "fetch_timeout_secs"];
    if let Ok(serde_json::Value::Object(raw)) = serde_json::from_str::<serde_json::Value>(content)
    {
        for key in raw.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            }
        }
    }
}

/// Write-to-temp-then-rename so a crash never leaves a truncated config.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ConfigError> {
    // SEC-009: unpredictable temp name, created with create_new so an existing
    // file or symlink at that path is never followed
    use std::time::{SystemTime, UNIX_EPOCH};
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

    let result = (|| {
        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        temp_file.write_all(content)?;
        temp_file.sync_all()?;
        drop(temp_file);

        // On Windows, rename fails if destination exists
        #[cfg(windows)]
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        std::fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ConfigError::Io(e));
    }
    Ok(())
}

// ============================================================================
// Intervals
// ============================================================================

/// Parse a poll interval such as `30s`, `1m`, `1h30m`, `1.5h` or `500ms`.
///
/// Accepts the units `ns`, `us` (`µs`), `ms`, `s`, `m` and `h`; several
/// number-unit pairs may be concatenated. Zero, negative and unitless values
/// are rejected because they would turn the scheduler into a busy loop.
pub fn parse_interval(input: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidInterval(input.to_string());

    let mut rest = input.trim();
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    if rest.is_empty() || rest.starts_with('-') {
        return Err(invalid());
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let number = &rest[..number_len];
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(invalid());
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total_nanos += value * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos < 1.0 || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos as u64))
}

// ============================================================================
// Tests
// ============================================================================
