use http::StatusCode;
use reqwest::blocking::Response;
use serde::Deserialize;

use crate::provider::ProviderError;

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(e.to_string())
    }
}

// Designate reports `{"code": .., "type": .., "message": ..}`, Keystone nests it in `{"error": {..}}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<NestedError>,
}

#[derive(Debug, Deserialize)]
struct NestedError {
    #[serde(default)]
    message: Option<String>,
}

/// The parts of an HTTP response needed to tell success from failure
pub trait ApiResponse {
    fn status(&self) -> StatusCode;
    fn into_text(self) -> String;
}

impl ApiResponse for Response {
    fn status(&self) -> StatusCode {
        Response::status(self)
    }

    fn into_text(self) -> String {
        self.text().unwrap_or_default()
    }
}

/// Pass through successful responses, turn everything else into [`ProviderError::Api`]
pub fn check_status<R: ApiResponse>(resp: R) -> Result<R, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.into_text();
    Err(ProviderError::Api {
        status,
        message: error_message(&body),
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(m), ..
        }) => m,
        Ok(ErrorBody {
            error: Some(NestedError { message: Some(m) }),
            ..
        }) => m,
        _ if body.trim().is_empty() => "no error message returned".to_string(),
        _ => body.trim().to_string(),
    }
}
