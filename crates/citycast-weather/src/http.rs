//! Shared HTTP plumbing for the service clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::types::WeatherError;

pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 10;
pub(crate) const USER_AGENT: &str = concat!("citycast/", env!("CARGO_PKG_VERSION"));

/// Error body shape used by OpenWeatherMap (`cod` may be a number or string)
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

pub(crate) fn build_client() -> Result<Client, WeatherError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Map a non-success response to a typed error
pub(crate) async fn error_for_response(response: Response, subject: &str) -> WeatherError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    tracing::debug!("{} request failed with {}: {}", subject, status, message);

    match status {
        StatusCode::UNAUTHORIZED => WeatherError::InvalidApiKey,
        StatusCode::NOT_FOUND => WeatherError::LocationNotFound(subject.to_string()),
        _ => WeatherError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
