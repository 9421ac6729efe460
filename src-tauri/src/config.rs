//! Runtime configuration.
//!
//! Values come from the process environment, optionally seeded from
//! `.env.local` / `.env` in the project root. Every key has a default, so an
//! empty environment yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BACKEND_PORT: u16 = 5001;
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 500;
pub const DEFAULT_PYTHON: &str = "python";
pub const DEFAULT_REGION_SHORTCUT: &str = "CommandOrControl+Shift+A";
pub const DEFAULT_QUICK_SHORTCUT: &str = "CommandOrControl+Shift+S";

/// How the backend worker is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Interpreter + script from the source checkout.
    Development,
    /// Bundled executable shipped in the app's resources.
    Packaged,
}

impl RunMode {
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            RunMode::Development
        } else {
            RunMode::Packaged
        }
    }

    pub fn is_dev(self) -> bool {
        self == RunMode::Development
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub backend_host: String,
    pub backend_port: u16,
    pub probe_interval: Duration,
    /// `None` keeps probing until the backend answers.
    pub probe_timeout: Option<Duration>,
    pub python: String,
    pub region_shortcut: String,
    pub quick_shortcut: String,
    pub run_mode: RunMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_host: DEFAULT_BACKEND_HOST.to_string(),
            backend_port: DEFAULT_BACKEND_PORT,
            probe_interval: Duration::from_millis(DEFAULT_PROBE_INTERVAL_MS),
            probe_timeout: None,
            python: DEFAULT_PYTHON.to_string(),
            region_shortcut: DEFAULT_REGION_SHORTCUT.to_string(),
            quick_shortcut: DEFAULT_QUICK_SHORTCUT.to_string(),
            run_mode: RunMode::current(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: String },
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(host) = get("LEX_BACKEND_HOST") {
            config.backend_host = host;
        }
        if let Some(raw) = get("LEX_BACKEND_PORT") {
            config.backend_port = parse_number::<u16>("LEX_BACKEND_PORT", &raw)?;
        }
        if let Some(raw) = get("LEX_PROBE_INTERVAL_MS") {
            let ms = parse_number::<u64>("LEX_PROBE_INTERVAL_MS", &raw)?;
            if ms == 0 {
                return Err(ConfigError::Zero {
                    key: "LEX_PROBE_INTERVAL_MS".to_string(),
                });
            }
            config.probe_interval = Duration::from_millis(ms);
        }
        if let Some(raw) = get("LEX_PROBE_TIMEOUT_MS") {
            let ms = parse_number::<u64>("LEX_PROBE_TIMEOUT_MS", &raw)?;
            config.probe_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(python) = get("LEX_PYTHON") {
            config.python = python;
        }
        if let Some(combo) = get("LEX_REGION_SHORTCUT") {
            config.region_shortcut = combo;
        }
        if let Some(combo) = get("LEX_QUICK_SHORTCUT") {
            config.quick_shortcut = combo;
        }

        Ok(config)
    }

    /// `http://host:port`, without a trailing slash.
    pub fn backend_base_url(&self) -> String {
        format!("http://{}:{}", self.backend_host, self.backend_port)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Source checkout root (the parent of `src-tauri/`).
///
/// Resolved from CARGO_MANIFEST_DIR at compile time so it does not depend on
/// the binary's working directory. Only meaningful in development builds.
pub fn project_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap_or(manifest_dir).to_path_buf()
}

/// Load `.env.local`, falling back to `.env`, from the project root.
///
/// Runs before the logger exists, so outcomes go to stderr.
pub fn load_dotenv() {
    let root = project_root();
    for env_file in [".env.local", ".env"] {
        let path = root.join(env_file);
        if path.exists() {
            match dotenvy::from_path(&path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break;
        }
    }
}
