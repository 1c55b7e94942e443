use log::{debug, trace};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::util::check_status;
use crate::config::{AuthMethod, ClientConfig, ProjectRef, UserRef};
use crate::provider::ProviderError;

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";
const DNS_SERVICE_TYPE: &str = "dns";

/// An authenticated Keystone session: the token and the Designate resource base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    /// Always ends with `v2/`
    pub base: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Token,
}

#[derive(Debug, Deserialize)]
struct Token {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    interface: String,
    #[serde(default)]
    region_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
    url: String,
}

/// Request a new token from Keystone and resolve the Designate endpoint
pub fn authenticate(client: &Client, config: &ClientConfig) -> Result<Session, ProviderError> {
    let url = format!("{}/auth/tokens", config.auth_url.trim_end_matches('/'));
    debug!("Requesting Keystone token from {}", url);

    let resp = client
        .post(url)
        .json(&auth_body(&config.auth))
        .send()
        .map_err(|e| ProviderError::Auth(e.to_string()))?;
    let resp = check_status(resp).map_err(|e| ProviderError::Auth(e.to_string()))?;

    let token = resp
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|t| t.to_str().ok())
        .ok_or_else(|| {
            ProviderError::Auth(format!("response is missing the {} header", SUBJECT_TOKEN_HEADER))
        })?
        .to_owned();
    let body: TokenResponse = resp
        .json()
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let endpoint = match &config.endpoint_override {
        Some(e) => e.to_owned(),
        None => find_endpoint(
            &body.token.catalog,
            &config.interface,
            config.region.as_deref(),
        )?,
    };
    trace!("Using DNS endpoint {}", endpoint);

    Ok(Session {
        token,
        base: resource_base(&endpoint),
    })
}

fn auth_body(auth: &AuthMethod) -> Value {
    match auth {
        AuthMethod::Password {
            user,
            password,
            project,
        } => {
            let mut user = match user {
                UserRef::Id(id) => json!({ "id": id }),
                UserRef::Name { name, domain } => json!({
                    "name": name,
                    "domain": { "name": domain },
                }),
            };
            user["password"] = json!(password);

            let mut body = json!({
                "auth": {
                    "identity": {
                        "methods": ["password"],
                        "password": { "user": user },
                    }
                }
            });
            if let Some(project) = project {
                body["auth"]["scope"] = match project {
                    ProjectRef::Id(id) => json!({ "project": { "id": id } }),
                    ProjectRef::Name { name, domain } => json!({
                        "project": { "name": name, "domain": { "name": domain } }
                    }),
                };
            }
            body
        }
        // Application credentials are always scoped to the project they were created in
        AuthMethod::ApplicationCredential { id, secret } => json!({
            "auth": {
                "identity": {
                    "methods": ["application_credential"],
                    "application_credential": { "id": id, "secret": secret },
                }
            }
        }),
    }
}

fn find_endpoint(
    catalog: &[CatalogEntry],
    interface: &str,
    region: Option<&str>,
) -> Result<String, ProviderError> {
    catalog
        .iter()
        .filter(|entry| entry.kind == DNS_SERVICE_TYPE)
        .flat_map(|entry| entry.endpoints.iter())
        .filter(|e| e.interface == interface)
        .find(|e| match region {
            Some(r) => e.region_id.as_deref() == Some(r) || e.region.as_deref() == Some(r),
            None => true,
        })
        .map(|e| e.url.to_owned())
        .ok_or_else(|| {
            ProviderError::Config(format!(
                "no {} endpoint with interface {} found in service catalog (region: {})",
                DNS_SERVICE_TYPE,
                interface,
                region.unwrap_or("any")
            ))
        })
}

// Catalog entries point at the service root, resources live below v2/
fn resource_base(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/v2") {
        format!("{}/", base)
    } else {
        format!("{}/v2/", base)
    }
}
