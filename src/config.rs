//! Configuration types for the solver.
//!
//! - [`ZoneConfig`] is decoded from the per-challenge configuration blob that comes with every request
//! - [`ClientConfig`] holds the OpenStack credentials used to connect to the DNS service

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default transport timeout for requests to Keystone and Designate
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-challenge solver configuration.
///
/// Set by users in the `config` field of the issuers webhook solver, e.g. `{"zone_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ZoneConfig {
    /// ID of the Designate zone that the challenge record is managed in
    pub zone_id: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing solver config, a zone_id field is required")]
    Missing,
    #[error("error decoding solver config: {0}")]
    Malformed(String),
    #[error("solver config contains an empty zone_id")]
    EmptyZoneId,
}

impl ZoneConfig {
    /// Decode the raw challenge configuration into a [`ZoneConfig`].
    ///
    /// Must be called for every request, as requests for the same DNS name may still carry different zones.
    pub fn decode(raw: Option<&serde_json::Value>) -> Result<ZoneConfig, ConfigError> {
        let raw = match raw {
            None | Some(serde_json::Value::Null) => return Err(ConfigError::Missing),
            Some(r) if r.is_object() => r,
            Some(_) => {
                return Err(ConfigError::Malformed(
                    "expected a JSON object with a zone_id field".to_string(),
                ))
            }
        };

        let cfg = ZoneConfig::deserialize(raw).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        if cfg.zone_id.trim().is_empty() {
            return Err(ConfigError::EmptyZoneId);
        }
        Ok(cfg)
    }
}

/// How to authenticate against Keystone
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    Password {
        user: UserRef,
        password: String,
        project: Option<ProjectRef>,
    },
    ApplicationCredential {
        id: String,
        secret: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserRef {
    Id(String),
    Name { name: String, domain: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectRef {
    Id(String),
    Name { name: String, domain: String },
}

/// Connection settings for the OpenStack DNS service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Keystone v3 endpoint, e.g. `https://keystone.example.com:5000/v3`
    pub auth_url: String,
    pub auth: AuthMethod,
    /// Only use catalog endpoints in this region
    pub region: Option<String>,
    /// Catalog endpoint interface, usually `public`
    pub interface: String,
    /// Skip the service catalog and talk to this Designate endpoint directly
    pub endpoint_override: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(auth_url: &str, auth: AuthMethod) -> Self {
        ClientConfig {
            auth_url: auth_url.to_owned(),
            auth,
            region: None,
            interface: "public".to_string(),
            endpoint_override: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
