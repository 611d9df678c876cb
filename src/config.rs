//! Store configuration. Precedence: CLI > env > config file > defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::DbError;

/// File looked up in the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "akoko-store.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one `<table>.json` per table for the local store.
    pub data_dir: PathBuf,
    /// Remote database; when absent the local store is used directly.
    pub remote: Option<RemoteConfig>,
    pub logging: LogConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("data"), remote: None, logging: LogConfig::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub uri: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub app_name: Option<String>,
    /// Bound on the whole connect handshake; exceeding it triggers the local fallback.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_database() -> String {
    "akoko".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl RemoteConfig {
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: default_database(),
            app_name: None,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub level: Option<String>,
    pub retention: Option<usize>,
}

impl StoreConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns `Config` if the TOML is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        Ok(toml::from_str::<Self>(s)?)
    }

    /// Read a TOML config file.
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read and `Config` if it cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, DbError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| DbError::Io(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    /// Overlay values from an environment lookup:
    /// `MONGODB_URI`, `AKOKO_DB_NAME`, `AKOKO_DATA_DIR`, `AKOKO_CONNECT_TIMEOUT_MS`.
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("MONGODB_URI").filter(|s| !s.trim().is_empty()) {
            match self.remote.as_mut() {
                Some(r) => r.uri = uri,
                None => self.remote = Some(RemoteConfig::new(uri)),
            }
        }
        if let Some(r) = self.remote.as_mut() {
            if let Some(name) = lookup("AKOKO_DB_NAME") {
                r.database = name;
            }
            if let Some(ms) = lookup("AKOKO_CONNECT_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
                r.connect_timeout_ms = ms;
            }
        }
        if let Some(dir) = lookup("AKOKO_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    /// Load from `explicit`, else `AKOKO_CONFIG`, else `./akoko-store.toml` if present,
    /// else defaults; then overlay the process environment.
    ///
    /// # Errors
    /// Returns an error if a named config file is missing or malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DbError> {
        let named = explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var("AKOKO_CONFIG").ok().map(PathBuf::from));
        let base = match named {
            Some(p) => Self::from_file(&p)?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() { Self::from_file(&local)? } else { Self::default() }
            }
        };
        Ok(base.with_env(|k| std::env::var(k).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_use_local_data_dir() {
        let c = StoreConfig::from_toml_str("").unwrap();
        assert_eq!(c, StoreConfig::default());
        assert!(c.remote.is_none());
    }

    #[test]
    fn toml_with_remote_section() {
        let c = StoreConfig::from_toml_str(
            r#"
            data_dir = "/srv/akoko/data"
            [remote]
            uri = "mongodb://db.example:27017"
            app_name = "Akoko"
            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        let r = c.remote.unwrap();
        assert_eq!(r.database, "akoko");
        assert_eq!(r.connect_timeout_ms, 5_000);
        assert_eq!(r.app_name.as_deref(), Some("Akoko"));
        assert_eq!(c.data_dir, PathBuf::from("/srv/akoko/data"));
        assert_eq!(c.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        assert!(matches!(StoreConfig::from_toml_str("data_dir = ["), Err(DbError::Config(_))));
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("MONGODB_URI", "mongodb://env-host"),
            ("AKOKO_DB_NAME", "school"),
            ("AKOKO_CONNECT_TIMEOUT_MS", "250"),
            ("AKOKO_DATA_DIR", "/tmp/akoko"),
        ]
        .into_iter()
        .collect();
        let c = StoreConfig::default().with_env(|k| env.get(k).map(|v| v.to_string()));
        let r = c.remote.unwrap();
        assert_eq!(r.uri, "mongodb://env-host");
        assert_eq!(r.database, "school");
        assert_eq!(r.connect_timeout_ms, 250);
        assert_eq!(c.data_dir, PathBuf::from("/tmp/akoko"));
    }

    #[test]
    fn db_name_without_uri_is_ignored() {
        let c = StoreConfig::default()
            .with_env(|k| (k == "AKOKO_DB_NAME").then(|| "school".to_string()));
        assert!(c.remote.is_none());
    }
}
