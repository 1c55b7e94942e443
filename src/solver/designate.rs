use std::sync::OnceLock;

use log::{debug, info, trace, warn};

use super::{PresentStep, Solver, SolverError, StopSignal};
use crate::{
    challenge::ChallengeRequest,
    config::{ClientConfig, ZoneConfig},
    provider::{NewRecordSet, Provider, ProviderFactory, RecordSet, TXT},
};

/// TTL of newly created challenge records. They are removed shortly after issuance anyway
pub const CHALLENGE_TTL: u32 = 600;

const SOLVER_NAME: &str = "designate-solver";

/// A [`Solver`] that publishes challenge records in OpenStack Designate zones.
///
/// The zone is taken from the `zone_id` field of each challenges configuration.
/// No record state is kept between calls: every operation re-reads the zone before changing it,
/// so several independent solver instances can work on the same zone.
pub struct DesignateSolver {
    factory: Box<dyn ProviderFactory>,
    provider: OnceLock<Box<dyn Provider>>,
    stop: OnceLock<StopSignal>,
}

impl DesignateSolver {
    /// Create a new solver. The provider is only connected once [`Solver::initialize()`] is called
    pub fn new(factory: Box<dyn ProviderFactory>) -> Self {
        DesignateSolver {
            factory,
            provider: OnceLock::new(),
            stop: OnceLock::new(),
        }
    }

    fn provider(&self) -> Result<&dyn Provider, SolverError> {
        if self.stop.get().is_some_and(|s| *s.borrow()) {
            return Err(SolverError::ShuttingDown);
        }
        self.provider
            .get()
            .map(|p| &**p)
            .ok_or(SolverError::NotInitialized)
    }

    // Find all TXT record sets with exactly this name
    fn locate(
        &self,
        provider: &dyn Provider,
        zone_id: &str,
        name: &str,
    ) -> Result<Vec<RecordSet>, SolverError> {
        let found = provider
            .list_recordsets(zone_id, TXT, name)
            .map_err(|e| SolverError::Lookup {
                zone_id: zone_id.to_owned(),
                name: name.to_owned(),
                source: e,
            })?;

        Ok(found
            .into_iter()
            .filter(|r| r.kind == TXT && r.name.eq_ignore_ascii_case(name))
            .inspect(|r| trace!("Found existing record set {}", r))
            .collect())
    }
}

impl Solver for DesignateSolver {
    fn name(&self) -> &'static str {
        SOLVER_NAME
    }

    fn initialize(&self, config: &ClientConfig, stop: StopSignal) -> Result<(), SolverError> {
        if self.provider.get().is_some() {
            warn!("Solver {} is already initialized, keeping existing client", SOLVER_NAME);
            return Ok(());
        }

        let provider = self.factory.connect(config).map_err(SolverError::Connect)?;
        if self.provider.set(provider).is_err() {
            debug!("Solver was initialized concurrently, discarding new client");
        }
        if self.stop.set(stop).is_err() {
            debug!("Stop signal was set concurrently, discarding new one");
        }
        info!("Initialized solver {}", SOLVER_NAME);
        Ok(())
    }

    fn present(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
        let cfg = ZoneConfig::decode(ch.config.as_ref())?;
        let provider = self.provider()?;
        debug!("Presenting challenge {} in zone {}", ch, cfg.zone_id);

        let existing = self.locate(provider, &cfg.zone_id, &ch.resolved_fqdn)?;

        // Designate keeps all values of a name in one record set, so the first match is the record set
        match existing.first() {
            Some(rs) if rs.has_only_value(&ch.key) => {
                info!(
                    "Record {} already contains the challenge key, nothing to do",
                    ch.resolved_fqdn
                );
            }
            Some(rs) => {
                info!(
                    "Replacing outdated values of record {} (id {})",
                    ch.resolved_fqdn, rs.id
                );
                provider
                    .update_recordset(&cfg.zone_id, &rs.id, &[ch.key.to_owned()])
                    .map_err(|e| SolverError::Present {
                        step: PresentStep::Update,
                        zone_id: cfg.zone_id.to_owned(),
                        name: ch.resolved_fqdn.to_owned(),
                        source: e,
                    })?;
            }
            None => {
                let new = NewRecordSet {
                    name: ch.resolved_fqdn.to_owned(),
                    kind: TXT.to_string(),
                    ttl: CHALLENGE_TTL,
                    description: format!("The acme record for {}", ch.dns_name),
                    records: vec![ch.key.to_owned()],
                };
                info!("Creating record {} in zone {}", new, cfg.zone_id);
                provider
                    .create_recordset(&cfg.zone_id, &new)
                    .map_err(|e| SolverError::Present {
                        step: PresentStep::Create,
                        zone_id: cfg.zone_id.to_owned(),
                        name: ch.resolved_fqdn.to_owned(),
                        source: e,
                    })?;
            }
        }
        Ok(())
    }

    fn cleanup(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
        let cfg = ZoneConfig::decode(ch.config.as_ref())?;
        let provider = self.provider()?;
        debug!("Cleaning up challenge {} in zone {}", ch, cfg.zone_id);

        let existing = self.locate(provider, &cfg.zone_id, &ch.resolved_fqdn)?;
        if existing.is_empty() {
            info!("No record {} found, nothing to clean up", ch.resolved_fqdn);
            return Ok(());
        }

        // Record sets carry their own zone, which is used over the requested one
        for rs in existing {
            if !rs.contains_value(&ch.key) {
                debug!("Record {} belongs to another challenge, leaving it alone", rs);
                continue;
            }

            let remaining = rs
                .records
                .iter()
                .zip(rs.txt_values())
                .filter(|(_, value)| *value != ch.key)
                .map(|(raw, _)| raw.to_owned())
                .collect::<Vec<_>>();
            // Record sets can't be empty, drop the whole set once only the key is left
            let result = if remaining.is_empty() {
                info!("Deleting record {}", rs);
                provider.delete_recordset(&rs.zone_id, &rs.id)
            } else {
                info!(
                    "Removing challenge key from record {}, keeping {} other value(s)",
                    rs,
                    remaining.len()
                );
                provider.update_recordset(&rs.zone_id, &rs.id, &remaining)
            };

            result.map_err(|e| SolverError::CleanUp {
                zone_id: rs.zone_id.to_owned(),
                record_id: rs.id.to_owned(),
                name: rs.name.to_owned(),
                source: e,
            })?;
        }
        Ok(())
    }
}
