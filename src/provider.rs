//! Access to the remote DNS zone service.
//!
//! A [`Provider`] offers list/create/update/delete operations over record sets scoped to a zone.
//! Providers are created through a [`ProviderFactory`], which lets the solver establish its client
//! lazily and lets tests inject doubles.
//!
//! The following providers are currently available:
//! - [`DesignateProvider`]: OpenStack Designate (DNS v2 API) with Keystone v3 authentication

mod designate;

#[cfg(test)]
use mockall::automock;

// Re-exports for convenience
pub use self::designate::{DesignateFactory, DesignateProvider};

use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClientConfig;

/// The only record type managed by this crate
pub const TXT: &str = "TXT";

/// A provider is a DNS zone service such as Designate.
/// It implements a few basic methods to read and modify record sets in a zone.
#[cfg_attr(test, automock)]
pub trait Provider: Send + Sync {
    /// Return all record sets of the given type and name in a zone.
    /// Implementations must drain every result page before returning.
    fn list_recordsets(
        &self,
        zone_id: &str,
        kind: &str,
        name: &str,
    ) -> Result<Vec<RecordSet>, ProviderError>;

    /// Create a new record set in a zone, returning the record set as reported by the service
    fn create_recordset(
        &self,
        zone_id: &str,
        recordset: &NewRecordSet,
    ) -> Result<RecordSet, ProviderError>;

    /// Replace the values of an existing record set
    fn update_recordset(
        &self,
        zone_id: &str,
        recordset_id: &str,
        records: &[String],
    ) -> Result<(), ProviderError>;

    /// Delete a record set
    fn delete_recordset(&self, zone_id: &str, recordset_id: &str) -> Result<(), ProviderError>;
}

/// Establishes a connected [`Provider`] from a [`ClientConfig`]
#[cfg_attr(test, automock)]
pub trait ProviderFactory: Send + Sync {
    fn connect(&self, config: &ClientConfig) -> Result<Box<dyn Provider>, ProviderError>;
}

// Generic error returned by a provider action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("[{status}] {message}")]
    Api {
        status: http::StatusCode,
        message: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// A record set as stored by the zone service: a name, a type and an ordered list of values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct RecordSet {
    pub id: String,
    pub zone_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub records: Vec<String>,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RecordSet {
    /// Returns the record values with surrounding TXT quotes removed
    pub fn txt_values(&self) -> Vec<&str> {
        self.records.iter().map(|r| unquote(r)).collect()
    }

    /// Whether this record set holds exactly one value, `value`
    pub fn has_only_value(&self, value: &str) -> bool {
        self.txt_values() == [value]
    }

    /// Whether any of the record values is `value`
    pub fn contains_value(&self, value: &str) -> bool {
        self.txt_values().contains(&value)
    }
}

impl Display for RecordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}] (id {}, zone {})",
            self.name,
            self.kind,
            self.records.iter().join(", "),
            self.id,
            self.zone_id
        )
    }
}

/// Request body for creating a record set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NewRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ttl: u32,
    pub description: String,
    pub records: Vec<String>,
}

impl Display for NewRecordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}] ttl {}",
            self.name,
            self.kind,
            self.records.iter().join(", "),
            self.ttl
        )
    }
}

// Designate hands TXT values back the way they were submitted, which may include quotes
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txt(records: &[&str]) -> RecordSet {
        RecordSet {
            id: "rs-1".to_string(),
            zone_id: "zone-123".to_string(),
            name: "_acme-challenge.example.com.".to_string(),
            kind: TXT.to_string(),
            records: records.iter().map(|r| r.to_string()).collect(),
            ttl: Some(600),
            description: None,
        }
    }

    #[test]
    fn should_match_single_value() {
        assert!(txt(&["abc123"]).has_only_value("abc123"));
        assert!(txt(&["\"abc123\""]).has_only_value("abc123"));
        assert!(!txt(&["stale"]).has_only_value("abc123"));
        assert!(!txt(&["abc123", "other"]).has_only_value("abc123"));
        assert!(!txt(&[]).has_only_value("abc123"));
    }

    #[test]
    fn should_find_contained_value() {
        assert!(txt(&["other", "\"abc123\""]).contains_value("abc123"));
        assert!(!txt(&["other"]).contains_value("abc123"));
    }

    #[test]
    fn should_not_strip_unbalanced_quotes() {
        assert_eq!(unquote("\"abc"), "\"abc");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("\"\""), "");
    }

    #[test]
    fn should_decode_designate_recordset() {
        let raw = serde_json::json!({
            "id": "f7b10e9b-0cae-4a91-b162-562bc6096648",
            "zone_id": "2150b1bf-dee2-4221-9d85-11f7886fb15f",
            "name": "_acme-challenge.example.com.",
            "type": "TXT",
            "records": ["abc123"],
            "ttl": null,
            "status": "ACTIVE",
            "action": "NONE",
            "version": 1
        });
        let rs: RecordSet = serde_json::from_value(raw).unwrap();
        assert_eq!(rs.kind, TXT);
        assert_eq!(rs.ttl, None);
        assert_eq!(rs.description, None);
        assert!(rs.has_only_value("abc123"));
    }
}
