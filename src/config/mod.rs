use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Context, Result};

pub mod validator;

/// Rows the backend returns at most for a single query.
pub const DEFAULT_ROW_LIMIT: u64 = 200_000;
/// Minutes during which the backend rejects an identical query.
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 30;
/// Repetition counter assigned to a signature on its first issuance.
pub const DEFAULT_REPEAT_BASE: u32 = 11;
pub const DEFAULT_HISTORY_FILE: &str = "csmar_query_history.json";
pub const DEFAULT_CONFIG_FILE: &str = "csmar.json";

const ENV_ENDPOINT: &str = "CSMAR_ENDPOINT";
const ENV_ACCOUNT: &str = "CSMAR_ACCOUNT";
const ENV_PASSWORD: &str = "CSMAR_PASSWORD";

/// Backend constraints the orchestrator works around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    pub row_limit: u64,
    pub cooldown_minutes: i64,
    pub repeat_base: u32,
}

impl QueryLimits {
    /// Cool-down as a duration, saturating for values chrono cannot represent.
    pub fn cooldown(&self) -> Duration {
        Duration::try_minutes(self.cooldown_minutes).unwrap_or(Duration::MAX)
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_ROW_LIMIT,
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            repeat_base: DEFAULT_REPEAT_BASE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the JSON gateway fronting the data service.
    pub endpoint: String,
    pub account: Option<String>,
    pub password: Option<String>,
    pub history_file: PathBuf,
    pub timeout_secs: u64,
    pub limits: QueryLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            account: None,
            password: None,
            history_file: PathBuf::from(DEFAULT_HISTORY_FILE),
            timeout_secs: 60,
            limits: QueryLimits::default(),
        }
    }
}

impl Config {
    /// Load the JSON config, falling back to defaults when no file is found.
    ///
    /// Environment variables override file values and `${VAR}` placeholders in
    /// credentials are expanded before the result is validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let search_paths = vec![
            path.to_path_buf(),
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|p| p.join(path)))
                .unwrap_or_else(|| path.to_path_buf()),
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf()),
        ];

        let mut config = None;
        for search_path in &search_paths {
            match std::fs::read_to_string(search_path) {
                Ok(content) => {
                    let parsed: Config = serde_json::from_str(&content).with_context(|| {
                        format!("Failed to parse config JSON at {}", search_path.display())
                    })?;
                    log::debug!("Loaded configuration from {}", search_path.display());
                    config = Some(parsed);
                    break;
                }
                Err(e) => {
                    log::debug!("Config candidate {} unavailable: {}", search_path.display(), e);
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            log::info!(
                "No config file found at {}; using built-in defaults",
                path.display()
            );
            Config::default()
        });

        config.apply_env_overrides();
        config.expand_placeholders()?;
        validator::validate_config(&config)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Ok(account) = std::env::var(ENV_ACCOUNT) {
            self.account = Some(account);
        }
        if let Ok(password) = std::env::var(ENV_PASSWORD) {
            self.password = Some(password);
        }
    }

    fn expand_placeholders(&mut self) -> Result<()> {
        self.endpoint = expand_env_vars(&self.endpoint)?;
        if let Some(account) = self.account.as_deref() {
            self.account = Some(expand_env_vars(account)?);
        }
        if let Some(password) = self.password.as_deref() {
            self.password = Some(expand_env_vars(password)?);
        }
        Ok(())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Replace every `${NAME}` in `value` with the matching environment variable.
pub fn expand_env_vars(value: &str) -> Result<String> {
    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        expanded.push_str(&rest[..open]);
        let tail = &rest[open + 2..];
        let close = tail
            .find('}')
            .ok_or_else(|| AppError::message("config has a `${` placeholder without a closing `}`"))?;

        let name = tail[..close].trim();
        if name.is_empty() {
            return Err(AppError::message("config has an empty `${}` placeholder"));
        }
        let resolved = std::env::var(name)
            .with_context(|| format!("config references unset environment variable {name}"))?;
        expanded.push_str(&resolved);
        rest = &tail[close + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}
