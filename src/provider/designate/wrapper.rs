#![cfg_attr(test, allow(dead_code))]

use std::sync::RwLock;

use http::StatusCode;
use log::{debug, trace};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use super::keystone::{self, Session};
use super::util::{check_status, ApiResponse};
use crate::config::ClientConfig;
use crate::provider::{NewRecordSet, ProviderError, RecordSet};

const DESIGNATE_RECORDSET_PAGE_SIZE: u16 = 100;
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// A single page of a record set listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSetPage {
    pub recordsets: Vec<RecordSet>,
    /// Whether the service reported a further page
    pub has_next: bool,
}

#[derive(Debug, Deserialize)]
struct RecordSetList {
    recordsets: Vec<RecordSet>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

/// Internal wrapper around the Designate v2 API. Handles Keystone authentication and token renewal
pub struct DesignateWrapper {
    client: Client,
    config: ClientConfig,
    session: RwLock<Session>,
}

impl DesignateWrapper {
    pub fn try_new(config: &ClientConfig) -> Result<DesignateWrapper, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let session = keystone::authenticate(&client, config)?;
        debug!("Authenticated with Keystone, DNS API at {}", session.base);

        Ok(DesignateWrapper {
            client,
            config: config.to_owned(),
            session: RwLock::new(session),
        })
    }

    // Fetch a single page. `marker` is the id of the last record set of the previous page
    pub fn list_recordsets(
        &self,
        zone_id: &str,
        kind: &str,
        name: &str,
        marker: Option<String>,
    ) -> Result<RecordSetPage, ProviderError> {
        let mut query = vec![
            ("type", kind.to_owned()),
            ("name", name.to_owned()),
            ("limit", DESIGNATE_RECORDSET_PAGE_SIZE.to_string()),
        ];
        if let Some(m) = marker {
            query.push(("marker", m));
        }

        let resp = self.send(&|client: &Client, session: &Session| {
            client
                .get(format!("{}zones/{}/recordsets", session.base, zone_id))
                .query(&query)
        })?;
        let list: RecordSetList = resp
            .json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        trace!(
            "Listed {} record sets in zone {}, next page: {:?}",
            list.recordsets.len(),
            zone_id,
            list.links.next
        );

        Ok(RecordSetPage {
            recordsets: list.recordsets,
            has_next: list.links.next.is_some(),
        })
    }

    pub fn create_recordset(
        &self,
        zone_id: &str,
        recordset: &NewRecordSet,
    ) -> Result<RecordSet, ProviderError> {
        let resp = self.send(&|client: &Client, session: &Session| {
            client
                .post(format!("{}zones/{}/recordsets", session.base, zone_id))
                .json(recordset)
        })?;
        resp.json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    pub fn update_recordset(
        &self,
        zone_id: &str,
        recordset_id: &str,
        records: &[String],
    ) -> Result<(), ProviderError> {
        self.send(&|client: &Client, session: &Session| {
            client
                .put(format!(
                    "{}zones/{}/recordsets/{}",
                    session.base, zone_id, recordset_id
                ))
                .json(&json!({ "records": records }))
        })?;
        Ok(())
    }

    pub fn delete_recordset(&self, zone_id: &str, recordset_id: &str) -> Result<(), ProviderError> {
        self.send(&|client: &Client, session: &Session| {
            client.delete(format!(
                "{}zones/{}/recordsets/{}",
                session.base, zone_id, recordset_id
            ))
        })?;
        Ok(())
    }
}

impl DesignateWrapper {
    fn send(
        &self,
        request: &dyn Fn(&Client, &Session) -> RequestBuilder,
    ) -> Result<Response, ProviderError> {
        send_authorized(
            || self.send_with_session(request),
            || {
                let session = keystone::authenticate(&self.client, &self.config)?;
                *self
                    .session
                    .write()
                    .map_err(|e| ProviderError::Transport(e.to_string()))? = session;
                Ok(())
            },
        )
    }

    fn send_with_session(
        &self,
        request: &dyn Fn(&Client, &Session) -> RequestBuilder,
    ) -> Result<Response, ProviderError> {
        let session = self
            .session
            .read()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(request(&self.client, &*session)
            .header(AUTH_TOKEN_HEADER, session.token.as_str())
            .send()?)
    }
}

// Run `attempt`. If the token has expired in the meantime, `reauthenticate` once
// and repeat the attempt with the new token.
fn send_authorized<R: ApiResponse>(
    attempt: impl Fn() -> Result<R, ProviderError>,
    reauthenticate: impl FnOnce() -> Result<(), ProviderError>,
) -> Result<R, ProviderError> {
    let resp = attempt()?;
    if resp.status() != StatusCode::UNAUTHORIZED {
        return check_status(resp);
    }

    debug!("Token was rejected, re-authenticating with Keystone");
    reauthenticate()?;
    check_status(attempt()?)
}

#[cfg(test)]
use mockall::mock;

#[cfg(test)]
mock! {
    pub DesignateWrapper {
        pub fn try_new(config: &ClientConfig) -> Result<Self, ProviderError>;
        pub fn list_recordsets(
            &self,
            zone_id: &str,
            kind: &str,
            name: &str,
            marker: Option<String>,
        ) -> Result<RecordSetPage, ProviderError>;
        pub fn create_recordset(
            &self,
            zone_id: &str,
            recordset: &NewRecordSet,
        ) -> Result<RecordSet, ProviderError>;
        pub fn update_recordset(
            &self,
            zone_id: &str,
            recordset_id: &str,
            records: &[String],
        ) -> Result<(), ProviderError>;
        pub fn delete_recordset(&self, zone_id: &str, recordset_id: &str) -> Result<(), ProviderError>;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::super::util::tests::response;
    use super::*;

    #[test]
    fn should_not_reauthenticate_on_success() {
        let attempts = Cell::new(0);
        let res = send_authorized(
            || {
                attempts.set(attempts.get() + 1);
                Ok(response(StatusCode::OK, "{}"))
            },
            || panic!("re-authenticated with a valid token"),
        );
        assert_eq!(res.map(|r| r.status()), Ok(StatusCode::OK));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn should_repeat_request_after_reauthentication() {
        let attempts = Cell::new(0);
        let reauths = Cell::new(0);
        let res = send_authorized(
            || {
                attempts.set(attempts.get() + 1);
                match attempts.get() {
                    1 => Ok(response(StatusCode::UNAUTHORIZED, "")),
                    _ => Ok(response(StatusCode::NO_CONTENT, "")),
                }
            },
            || {
                reauths.set(reauths.get() + 1);
                Ok(())
            },
        );
        assert_eq!(res.map(|r| r.status()), Ok(StatusCode::NO_CONTENT));
        assert_eq!(attempts.get(), 2);
        assert_eq!(reauths.get(), 1);
    }

    #[test]
    fn should_give_up_after_second_rejection() {
        let attempts = Cell::new(0);
        let reauths = Cell::new(0);
        let res = send_authorized(
            || {
                attempts.set(attempts.get() + 1);
                Ok(response(
                    StatusCode::UNAUTHORIZED,
                    r#"{"error": {"code": 401, "message": "The request you have made requires authentication."}}"#,
                ))
            },
            || {
                reauths.set(reauths.get() + 1);
                Ok(())
            },
        );
        assert_eq!(
            res.map(|r| r.status()),
            Err(ProviderError::Api {
                status: StatusCode::UNAUTHORIZED,
                message: "The request you have made requires authentication.".to_string(),
            })
        );
        assert_eq!(attempts.get(), 2);
        assert_eq!(reauths.get(), 1);
    }

    #[test]
    fn should_fail_when_reauthentication_fails() {
        let attempts = Cell::new(0);
        let res = send_authorized(
            || {
                attempts.set(attempts.get() + 1);
                Ok(response(StatusCode::UNAUTHORIZED, ""))
            },
            || Err(ProviderError::Auth("invalid credentials".to_string())),
        );
        assert_eq!(
            res.map(|r| r.status()),
            Err(ProviderError::Auth("invalid credentials".to_string()))
        );
        assert_eq!(attempts.get(), 1);
    }
}
