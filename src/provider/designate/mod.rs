mod keystone;
mod util;
mod wrapper;

use log::{debug, trace};
use mockall_double::double;

#[double]
use wrapper::DesignateWrapper;

use super::{NewRecordSet, Provider, ProviderError, ProviderFactory, RecordSet};
use crate::config::ClientConfig;

/// A [`Provider`] connecting to the OpenStack Designate v2 API.
///
/// The provider authenticates with Keystone when it is created and re-authenticates transparently
/// if its token expires. Record set listings are always drained completely.
///
/// To create a provider, use the [`DesignateProvider::from_config()`] function or a [`DesignateFactory`].
#[non_exhaustive]
pub struct DesignateProvider {
    api: DesignateWrapper,
}

impl DesignateProvider {
    pub fn from_config(config: &ClientConfig) -> Result<Box<dyn Provider>, ProviderError> {
        let api = DesignateWrapper::try_new(config)?;
        debug!("Connected to Designate via {}", config.auth_url);
        Ok(Box::new(DesignateProvider { api }))
    }
}

impl Provider for DesignateProvider {
    fn list_recordsets(
        &self,
        zone_id: &str,
        kind: &str,
        name: &str,
    ) -> Result<Vec<RecordSet>, ProviderError> {
        let mut recordsets: Vec<RecordSet> = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .api
                .list_recordsets(zone_id, kind, name, marker.to_owned())?;
            trace!(
                "Retrieved page with {} record sets for {} {}",
                page.recordsets.len(),
                name,
                kind
            );
            // An empty page can't carry a marker, so there is nothing left to follow
            if !page.has_next || page.recordsets.is_empty() {
                recordsets.extend(page.recordsets);
                break;
            }
            marker = page.recordsets.last().map(|r| r.id.to_owned());
            recordsets.extend(page.recordsets);
        }

        debug!(
            "Found {} {} record sets named {} in zone {}",
            recordsets.len(),
            kind,
            name,
            zone_id
        );
        Ok(recordsets)
    }

    fn create_recordset(
        &self,
        zone_id: &str,
        recordset: &NewRecordSet,
    ) -> Result<RecordSet, ProviderError> {
        let created = self.api.create_recordset(zone_id, recordset)?;
        debug!("Created record set {}", created);
        Ok(created)
    }

    fn update_recordset(
        &self,
        zone_id: &str,
        recordset_id: &str,
        records: &[String],
    ) -> Result<(), ProviderError> {
        self.api.update_recordset(zone_id, recordset_id, records)?;
        debug!(
            "Updated record set {} in zone {} to {:?}",
            recordset_id, zone_id, records
        );
        Ok(())
    }

    fn delete_recordset(&self, zone_id: &str, recordset_id: &str) -> Result<(), ProviderError> {
        self.api.delete_recordset(zone_id, recordset_id)?;
        debug!("Deleted record set {} from zone {}", recordset_id, zone_id);
        Ok(())
    }
}

/// [`ProviderFactory`] that connects a [`DesignateProvider`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DesignateFactory;

impl ProviderFactory for DesignateFactory {
    fn connect(&self, config: &ClientConfig) -> Result<Box<dyn Provider>, ProviderError> {
        DesignateProvider::from_config(config)
    }
}

#[cfg(test)]
mod tests {
    use mockall::{predicate::eq, Sequence};
    use totems::assert_err;

    use super::wrapper::RecordSetPage;
    use super::*;
    use crate::provider::TXT;

    const ZONE: &str = "zone-123";
    const FQDN: &str = "_acme-challenge.example.com.";

    fn recordset(id: &str) -> RecordSet {
        RecordSet {
            id: id.to_string(),
            zone_id: ZONE.to_string(),
            name: FQDN.to_string(),
            kind: TXT.to_string(),
            records: vec!["abc123".to_string()],
            ttl: Some(600),
            description: None,
        }
    }

    fn page(ids: &[&str], has_next: bool) -> RecordSetPage {
        RecordSetPage {
            recordsets: ids.iter().map(|id| recordset(id)).collect(),
            has_next,
        }
    }

    #[test]
    fn should_drain_all_pages() {
        let mut api = DesignateWrapper::default();
        let mut seq = Sequence::new();
        api.expect_list_recordsets()
            .with(eq(ZONE), eq(TXT), eq(FQDN), eq(None::<String>))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(page(&["rs-1", "rs-2"], true)));
        api.expect_list_recordsets()
            .with(eq(ZONE), eq(TXT), eq(FQDN), eq(Some("rs-2".to_string())))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(page(&["rs-3"], true)));
        api.expect_list_recordsets()
            .with(eq(ZONE), eq(TXT), eq(FQDN), eq(Some("rs-3".to_string())))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(page(&["rs-4"], false)));

        let provider = DesignateProvider { api };
        let ids = provider
            .list_recordsets(ZONE, TXT, FQDN)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["rs-1", "rs-2", "rs-3", "rs-4"]);
    }

    #[test]
    fn should_stop_on_empty_page() {
        let mut api = DesignateWrapper::default();
        api.expect_list_recordsets()
            .times(1)
            .returning(|_, _, _, _| Ok(page(&[], true)));

        let provider = DesignateProvider { api };
        assert!(provider.list_recordsets(ZONE, TXT, FQDN).unwrap().is_empty());
    }

    #[test]
    fn should_fail_on_any_page_error() {
        let mut api = DesignateWrapper::default();
        let mut seq = Sequence::new();
        api.expect_list_recordsets()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(page(&["rs-1"], true)));
        api.expect_list_recordsets()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| {
                Err(ProviderError::Api {
                    status: http::StatusCode::SERVICE_UNAVAILABLE,
                    message: "try again later".to_string(),
                })
            });

        let provider = DesignateProvider { api };
        let res = provider.list_recordsets(ZONE, TXT, FQDN);
        assert_err!(&res);
    }

    #[test]
    fn should_forward_mutations() {
        let mut api = DesignateWrapper::default();
        api.expect_create_recordset()
            .withf(|zone, rs| zone == ZONE && rs.name == FQDN && rs.ttl == 600)
            .times(1)
            .returning(|_, _| Ok(recordset("rs-1")));
        api.expect_update_recordset()
            .withf(|zone, id, records| {
                zone == ZONE && id == "rs-1" && records.to_vec() == vec!["fresh".to_string()]
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        api.expect_delete_recordset()
            .with(eq(ZONE), eq("rs-1"))
            .times(1)
            .returning(|_, _| Ok(()));

        let provider = DesignateProvider { api };
        let created = provider
            .create_recordset(
                ZONE,
                &NewRecordSet {
                    name: FQDN.to_string(),
                    kind: TXT.to_string(),
                    ttl: 600,
                    description: "The acme record for example.com".to_string(),
                    records: vec!["abc123".to_string()],
                },
            )
            .unwrap();
        assert_eq!(created.id, "rs-1");
        provider
            .update_recordset(ZONE, "rs-1", &["fresh".to_string()])
            .unwrap();
        provider.delete_recordset(ZONE, "rs-1").unwrap();
    }
}
