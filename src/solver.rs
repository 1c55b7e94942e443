//! DNS-01 challenge solvers.
//!
//! A [`Solver`] is the capability interface that the issuing controller's host calls into.
//! The host must call [`Solver::initialize()`] once before the first challenge,
//! afterwards [`Solver::present()`] and [`Solver::cleanup()`] may be called concurrently.
//!
//! The following solvers are currently available:
//! - [`DesignateSolver`]: publishes challenge records in OpenStack Designate zones

mod designate;

pub use designate::{DesignateSolver, CHALLENGE_TTL};

use std::fmt::Display;

use thiserror::Error;
use tokio::sync::watch;

use crate::{
    challenge::ChallengeRequest,
    config::{ClientConfig, ConfigError},
    provider::ProviderError,
};

/// Fires (turns `true`) when the host is shutting down
pub type StopSignal = watch::Receiver<bool>;

pub trait Solver: Send + Sync {
    /// Name of this solver, unique within the group of solvers served by one host
    fn name(&self) -> &'static str;

    /// Called once when the host starts, before any challenge is handed to the solver
    fn initialize(&self, config: &ClientConfig, stop: StopSignal) -> Result<(), SolverError>;

    /// Publish the challenge record. Must tolerate being called multiple times with the same request.
    fn present(&self, ch: &ChallengeRequest) -> Result<(), SolverError>;

    /// Remove the challenge record. Other challenge values published under the same name are left in place.
    fn cleanup(&self, ch: &ChallengeRequest) -> Result<(), SolverError>;
}

/// The step of [`Solver::present()`] that failed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PresentStep {
    Create,
    Update,
}

impl Display for PresentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresentStep::Create => write!(f, "create"),
            PresentStep::Update => write!(f, "update"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("could not list TXT records named {name} in zone {zone_id}: {source}")]
    Lookup {
        zone_id: String,
        name: String,
        source: ProviderError,
    },
    #[error("could not {step} TXT record {name} in zone {zone_id}: {source}")]
    Present {
        step: PresentStep,
        zone_id: String,
        name: String,
        source: ProviderError,
    },
    #[error("could not remove TXT record {name} (id {record_id}) in zone {zone_id}: {source}")]
    CleanUp {
        zone_id: String,
        record_id: String,
        name: String,
        source: ProviderError,
    },
    #[error("could not connect to the DNS service: {0}")]
    Connect(ProviderError),
    #[error("solver has not been initialized")]
    NotInitialized,
    #[error("solver is shutting down")]
    ShuttingDown,
}

impl SolverError {
    /// Whether calling the same operation again later may succeed.
    /// Configuration and lifecycle errors won't resolve themselves.
    pub fn is_retryable(&self) -> bool {
        match self {
            SolverError::Lookup { .. }
            | SolverError::Present { .. }
            | SolverError::CleanUp { .. }
            | SolverError::Connect(_) => true,
            SolverError::Config(_) | SolverError::NotInitialized | SolverError::ShuttingDown => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_classify_retryable_errors() {
        let cause = ProviderError::Transport("connection reset".to_string());
        assert!(SolverError::Lookup {
            zone_id: "zone-123".to_string(),
            name: "_acme-challenge.example.com.".to_string(),
            source: cause.clone(),
        }
        .is_retryable());
        assert!(SolverError::Connect(cause).is_retryable());
        assert!(!SolverError::Config(ConfigError::Missing).is_retryable());
        assert!(!SolverError::NotInitialized.is_retryable());
    }

    #[test]
    fn should_name_failed_step() {
        let err = SolverError::Present {
            step: PresentStep::Update,
            zone_id: "zone-123".to_string(),
            name: "_acme-challenge.example.com.".to_string(),
            source: ProviderError::Api {
                status: http::StatusCode::FORBIDDEN,
                message: "denied".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "could not update TXT record _acme-challenge.example.com. in zone zone-123: [403 Forbidden] denied"
        );
    }
}
