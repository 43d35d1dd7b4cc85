//! Service configuration.
//!
//! Read from an optional `service.toml` next to the service executable.
//! Every key has a default, so a missing file just means "run with
//! defaults":
//!
//! ```toml
//! bind_address = "127.0.0.1"   # IPv4 or IPv6 literal
//! port = 5001
//! artifact_dir = "artifacts"   # relative to the service directory
//! model_file = "energy_bill_model.json"
//! scaler_file = "scaler.json"
//! log_level = "info"
//! log_file = "energy_bill.log"
//! console_timestamps = true
//! ```

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::model::ConfigError;

/// Config file looked up in the service directory.
pub const CONFIG_FILE: &str = "service.toml";

const BUILT_IN: &str = "built-in defaults";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub artifact_dir: PathBuf,
    pub model_file: String,
    pub scaler_file: String,
    pub log_level: String,
    pub log_file: Option<String>,
    pub console_timestamps: bool,
    /// Where this config came from: a file path or the built-in defaults.
    #[serde(skip)]
    pub origin: String,
}

impl Default for ServiceConfig {
    /// Defaults with `artifact_dir` still relative; see `resolve_paths`.
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5001,
            artifact_dir: PathBuf::from("artifacts"),
            model_file: "energy_bill_model.json".to_string(),
            scaler_file: "scaler.json".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            console_timestamps: true,
            origin: BUILT_IN.to_string(),
        }
    }
}

/// The directory holding the running executable.
///
/// Artifacts and `service.toml` are looked up here at runtime, so a
/// deployed binary finds the files shipped next to it.
pub fn service_dir() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(|e| ConfigError::Io {
        path: "current executable".to_string(),
        message: e.to_string(),
    })?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::Io {
            path: exe.display().to_string(),
            message: "executable has no parent directory".to_string(),
        })
}

impl ServiceConfig {
    /// Defaults for a service living in `base_dir`.
    pub fn defaults_in(base_dir: &Path) -> Self {
        let mut config = Self::default();
        config.resolve_paths(base_dir);
        config
    }

    /// Parses config text. A relative `artifact_dir` is resolved against
    /// `base_dir`.
    pub fn from_toml(text: &str, origin: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: ServiceConfig = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.origin = origin.to_string();

        config.log_level().map_err(|message| ConfigError::Parse {
            path: origin.to_string(),
            message,
        })?;
        config.socket_addr()?;

        config.resolve_paths(base_dir);
        Ok(config)
    }

    /// Reads a config file that must exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: origin.clone(),
            message: e.to_string(),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml(&text, &origin, base_dir)
    }

    /// `service.toml` in `base_dir` if present, defaults otherwise.
    pub fn load_from_dir(base_dir: &Path) -> Result<Self, ConfigError> {
        let path = base_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::defaults_in(base_dir))
        }
    }

    /// Resolves the config for this process from the service directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_dir(&service_dir()?)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        if self.artifact_dir.is_relative() {
            self.artifact_dir = base_dir.join(&self.artifact_dir);
        }
    }

    pub fn log_level(&self) -> Result<LogLevel, String> {
        self.log_level.parse()
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.model_file)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.scaler_file)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_address.trim().parse().map_err(
            |e: std::net::AddrParseError| ConfigError::Parse {
                path: self.origin.clone(),
                message: format!("bind_address '{}': {}", self.bind_address, e),
            },
        )?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
