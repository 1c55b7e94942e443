use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Which operation a [`ChallengeRequest`] asks for
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeAction {
    Present,
    CleanUp,
}

impl Display for ChallengeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeAction::Present => write!(f, "Present"),
            ChallengeAction::CleanUp => write!(f, "CleanUp"),
        }
    }
}

/// A single DNS-01 challenge, as handed to a [`Solver`](crate::solver::Solver) by the issuing controller.
///
/// Only `dns_name`, `resolved_fqdn`, `key` and `config` are used for solving,
/// the remaining fields are accepted so that complete controller payloads can be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ChallengeAction>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub challenge_type: Option<String>,
    /// The domain the certificate is requested for, e.g. `example.com`
    pub dns_name: String,
    /// The TXT record value to publish
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_namespace: Option<String>,
    /// Fully qualified name of the TXT record, e.g. `_acme-challenge.example.com.`
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_zone: Option<String>,
    #[serde(default)]
    pub allow_ambient_credentials: bool,
    /// Opaque solver configuration, decoded into a [`ZoneConfig`](crate::config::ZoneConfig)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl Display for ChallengeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.resolved_fqdn, self.dns_name)
    }
}
