//! TOML configuration for the CLI, plus host-side persistence of whole
//! parameter sets ("stimulus protocol files").
//!
//! Fields carry serde defaults so a partial file, or no file at all,
//! still yields a working configuration. Example:
//!
//! ```toml
//! [device]
//! port = "/dev/ttyACM0"
//! timeout_ms = 1000
//!
//! [client]
//! name = "RIG2"
//! log_level = "debug"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pulsepal_core::ParameterStore;

use crate::session::CLIENT_NAME;
use crate::transport::serial::DEFAULT_BAUD_RATE;

/// Error type for configuration and parameter-file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The content could not be serialized to TOML.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub client: ClientSettings,
}

/// Serial-port settings for reaching the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Serial port path, e.g. `/dev/ttyACM0` or `COM3`.
    #[serde(default = "default_port")]
    pub port: String,
    /// Nominal baud rate; the device is a CDC virtual COM port.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read timeout in milliseconds; bounds every acknowledgement wait.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Host-side behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSettings {
    /// Name announced on the device OLED after connecting.
    #[serde(default = "default_client_name")]
    pub name: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> String {
    "/dev/ttyACM0".to_string()
}
fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_timeout_ms() -> u64 {
    1_000
}
fn default_client_name() -> String {
    CLIENT_NAME.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            log_level: default_log_level(),
        }
    }
}

/// Loads a [`ClientConfig`], returning the defaults if `path` does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
pub fn save_config(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    write_toml(path, &toml::to_string_pretty(config)?)
}

/// Saves a complete parameter set as a TOML protocol file, so a stimulus
/// protocol can be versioned host-side and replayed onto any device.
pub fn save_parameter_file(store: &ParameterStore, path: &Path) -> Result<(), ConfigError> {
    write_toml(path, &toml::to_string_pretty(store)?)
}

/// Loads a parameter set previously written by [`save_parameter_file`].
pub fn load_parameter_file(path: &Path) -> Result<ParameterStore, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

fn write_toml(path: &Path, content: &str) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsepal_core::{OutputChannel, OutputParam, ParamValue};

    #[test]
    fn test_default_config_values() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.device.baud_rate, 115_200);
        assert_eq!(cfg.device.timeout_ms, 1_000);
        assert_eq!(cfg.client.name, "RUST");
        assert_eq!(cfg.client.log_level, "info");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: ClientConfig = toml::from_str(
            r#"
[device]
port = "COM7"
"#,
        )
        .expect("deserialize partial");
        assert_eq!(cfg.device.port, "COM7");
        assert_eq!(cfg.device.baud_rate, 115_200);
        assert_eq!(cfg.client.log_level, "info");
    }

    #[test]
    fn test_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulsepal.toml");

        let mut cfg = ClientConfig::default();
        cfg.device.port = "/dev/ttyACM3".to_string();
        cfg.client.log_level = "debug".to_string();

        save_config(&cfg, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_load_config_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[[[ not toml").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parameter_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protocol.toml");

        let mut store = ParameterStore::new();
        store
            .apply(
                OutputChannel::Ch2,
                OutputParam::PulseTrainDuration,
                ParamValue::Seconds(3.5),
            )
            .unwrap();
        store
            .apply(
                OutputChannel::Ch2,
                OutputParam::IsBiphasic,
                ParamValue::Flag(true),
            )
            .unwrap();

        save_parameter_file(&store, &path).unwrap();
        let loaded = load_parameter_file(&path).unwrap();
        assert_eq!(loaded, store);
    }
}
