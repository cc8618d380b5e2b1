use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const HOME_ENV: &str = "TASKBOARD_HOME";
const DB_ENV: &str = "TASKBOARD_DB";
const HOME_DIR: &str = ".taskboard";
const SETTINGS_FILE: &str = "settings.json";
const SESSION_FILE: &str = "session.json";
const DEFAULT_DB_FILE: &str = "taskboard.db";
const DEFAULT_SESSION_HOURS: i64 = 24 * 7;
const DEFAULT_LOG_FILTER: &str = "taskboard=info";

fn default_session_hours() -> i64 {
    DEFAULT_SESSION_HOURS
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Database file; relative paths resolve against the home directory.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub log: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            session_hours: DEFAULT_SESSION_HOURS,
            log: None,
        }
    }
}

/// The access token kept between CLI invocations.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
}

impl Settings {
    /// `$TASKBOARD_HOME`, else `~/.taskboard`.
    pub fn home() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_ENV) {
            return Ok(PathBuf::from(home));
        }
        dirs::home_dir()
            .map(|h| h.join(HOME_DIR))
            .context("cannot determine home directory; set TASKBOARD_HOME")
    }

    /// Reads `settings.json` from `home`. Missing or malformed file yields defaults.
    pub fn load(home: &Path) -> Self {
        Self::read_file(&home.join(SETTINGS_FILE)).unwrap_or_default()
    }

    fn read_file(path: &Path) -> Option<Self> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring malformed settings: {e}");
                None
            }
        }
    }

    pub fn save_to(&self, home: &Path) -> Result<()> {
        fs::create_dir_all(home)
            .with_context(|| format!("failed to create {}", home.display()))?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(home.join(SETTINGS_FILE), json.as_bytes()).context("failed to write settings")
    }

    /// `TASKBOARD_DB` wins over the configured path, which wins over the default.
    pub fn database_path(&self, home: &Path) -> PathBuf {
        self.resolve_database(home, std::env::var_os(DB_ENV).map(PathBuf::from))
    }

    fn resolve_database(&self, home: &Path, env_override: Option<PathBuf>) -> PathBuf {
        if let Some(path) = env_override {
            return path;
        }
        match &self.database {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => home.join(path),
            None => home.join(DEFAULT_DB_FILE),
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_hours.max(1))
    }

    pub fn log_filter(&self) -> &str {
        self.log.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

pub fn save_session(home: &Path, access_token: &str) -> Result<()> {
    fs::create_dir_all(home)
        .with_context(|| format!("failed to create {}", home.display()))?;
    let json = serde_json::to_string(&StoredSession {
        access_token: access_token.to_string(),
    })?;
    fs::write(home.join(SESSION_FILE), json.as_bytes()).context("failed to write session file")
}

pub fn load_session(home: &Path) -> Option<String> {
    let data = fs::read_to_string(home.join(SESSION_FILE)).ok()?;
    serde_json::from_str::<StoredSession>(&data)
        .ok()
        .map(|s| s.access_token)
}

pub fn clear_session(home: &Path) -> Result<()> {
    match fs::remove_file(home.join(SESSION_FILE)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("failed to remove session file"),
    }
}
