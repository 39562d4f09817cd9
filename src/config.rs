//! Process configuration read from the environment.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::verification::DEFAULT_VERIFY_TIMEOUT;

/// Deployment mode. Production hides internal error details from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn exposes_internal_errors(&self) -> bool {
        *self == Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => bail!("APP_ENV must be 'development' or 'production', got '{}'", other),
        }
    }
}

/// Settings for both services and the CLI.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub credit_bind_addr: String,
    pub credit_db_path: PathBuf,
    pub directory_bind_addr: String,
    pub directory_db_path: PathBuf,
    /// API root of the client directory, e.g. `http://localhost:3001/api`
    pub directory_url: String,
    pub verify_timeout: Duration,
    pub environment: Environment,
    pub cors_origin: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            credit_bind_addr: "0.0.0.0:3002".to_string(),
            credit_db_path: PathBuf::from("credits.db"),
            directory_bind_addr: "0.0.0.0:3001".to_string(),
            directory_db_path: PathBuf::from("customers.db"),
            directory_url: "http://localhost:3001/api".to_string(),
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            environment: Environment::Development,
            cors_origin: "*".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Process environment, falling back to `./.env` when one exists.
    pub fn from_env() -> Result<Self> {
        let dotenv = Path::new(".env");
        if dotenv.is_file() {
            Self::from_env_file(dotenv)
        } else {
            Self::from_lookup(|key| std::env::var(key).ok())
        }
    }

    /// Like `from_env`, with `path` as the dotenv file. Variables already set
    /// in the process environment win over the file.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let mut file_vars = HashMap::new();
        let entries = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        for entry in entries {
            let (key, value) =
                entry.with_context(|| format!("failed to parse {}", path.display()))?;
            file_vars.insert(key, value);
        }
        tracing::debug!(path = %path.display(), vars = file_vars.len(), "dotenv file loaded");

        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("CREDIT_BIND_ADDR") {
            config.credit_bind_addr = addr;
        }
        if let Some(path) = lookup("CREDIT_DB_PATH") {
            config.credit_db_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("DIRECTORY_BIND_ADDR") {
            config.directory_bind_addr = addr;
        }
        if let Some(path) = lookup("DIRECTORY_DB_PATH") {
            config.directory_db_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("CLIENT_DIRECTORY_URL") {
            config.directory_url = url;
        }
        if let Some(ms) = lookup("VERIFY_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().with_context(|| {
                format!("VERIFY_TIMEOUT_MS must be a number of milliseconds, got '{}'", ms)
            })?;
            if ms == 0 {
                bail!("VERIFY_TIMEOUT_MS must be greater than zero");
            }
            config.verify_timeout = Duration::from_millis(ms);
        }
        if let Some(env) = lookup("APP_ENV") {
            config.environment = env.parse()?;
        }
        if let Some(origin) = lookup("CORS_ORIGIN") {
            config.cors_origin = origin;
        }

        Ok(config)
    }
}
