//! Runtime configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "SUPPLYGATE_BIND_ADDR";
pub const SEED_DEMO_VAR: &str = "SUPPLYGATE_SEED_DEMO";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a socket address: {value}")]
    InvalidAddr { var: &'static str, value: String },

    #[error("{var} must be a boolean, got: {value}")]
    InvalidFlag { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Seed one demo requisition at startup (dev only).
    pub seed_demo: bool,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source (the process env in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAddr {
                var: BIND_ADDR_VAR,
                value: raw_addr.clone(),
            })?;

        let seed_demo = match lookup(SEED_DEMO_VAR) {
            None => false,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "" | "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidFlag {
                        var: SEED_DEMO_VAR,
                        value,
                    });
                }
            },
        };

        Ok(Self {
            bind_addr,
            seed_demo,
        })
    }
}
