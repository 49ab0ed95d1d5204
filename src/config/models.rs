// src/config/models.rs
use hyper::http::uri::Authority;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid backend address {address:?}: {reason}")]
    InvalidBackend { address: String, reason: String },

    #[error("Probe timeout must be greater than zero")]
    ZeroProbeTimeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    #[serde(default = "default_backends")]
    pub backends: Vec<String>,

    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_listen_port() -> u16 {
    8080
}

fn default_backends() -> Vec<String> {
    vec![
        "localhost:8081".to_string(),
        "localhost:8083".to_string(),
        "localhost:8085".to_string(),
    ]
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            backends: default_backends(),
            probe: ProbeConfig::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for address in &self.backends {
            validate_backend_address(address)?;
        }

        if self.probe.timeout_ms == 0 {
            return Err(ConfigError::ZeroProbeTimeout);
        }

        Ok(())
    }
}

/// A backend must be a bare `host:port` authority with an explicit port.
fn validate_backend_address(address: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBackend {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let authority = Authority::from_str(address).map_err(|e| invalid(&e.to_string()))?;

    if authority.host().is_empty() {
        return Err(invalid("missing host"));
    }
    if authority.port_u16().is_none() {
        return Err(invalid("missing or invalid port"));
    }
    if authority.as_str().contains('@') {
        return Err(invalid("credentials are not allowed"));
    }

    Ok(())
}
