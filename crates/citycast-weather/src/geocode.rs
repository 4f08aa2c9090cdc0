//! Forward geocoding: free-text city search via OpenWeatherMap's
//! `/geo/1.0/direct` endpoint.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::http::{build_client, error_for_response, join_url};
use crate::provider::OPENWEATHER_BASE_URL;
use crate::search::{should_search_with, MIN_QUERY_LEN};
use crate::types::WeatherError;
use citycast_locations::City;

/// The service never returns more than this many candidates
pub const MAX_RESULTS: u8 = 5;

#[derive(Debug, Deserialize)]
struct DirectGeocodeResult {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    limit: u8,
    min_query_len: usize,
}

impl GeocodeClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, WeatherError> {
        Self::with_base_url(api_key, OPENWEATHER_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        Ok(Self {
            client: Arc::new(build_client()?),
            base_url: base_url.into(),
            api_key: api_key.into(),
            limit: MAX_RESULTS,
            min_query_len: MIN_QUERY_LEN,
        })
    }

    /// Cap the number of candidates (clamped to 1..=5)
    pub fn with_limit(mut self, limit: u8) -> Self {
        self.limit = limit.clamp(1, MAX_RESULTS);
        self
    }

    pub fn with_min_query_len(mut self, min_query_len: usize) -> Self {
        self.min_query_len = min_query_len;
        self
    }

    /// Candidate cities for a free-text query.
    ///
    /// Queries shorter than the minimum length return an empty list without
    /// touching the network. Candidates sharing coordinates are collapsed.
    ///
    /// # Errors
    /// `MissingApiKey`, `InvalidApiKey`, `Api`, `Network` or `Parse`.
    pub async fn search(&self, query: &str) -> Result<Vec<City>, WeatherError> {
        let query = query.trim();
        if !should_search_with(query, self.min_query_len) {
            return Ok(Vec::new());
        }
        if self.api_key.trim().is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let url = join_url(&self.base_url, "geo/1.0/direct");
        tracing::debug!("Searching cities for '{}'", query);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query.to_string()),
                ("limit", self.limit.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response, query).await);
        }

        let results: Vec<DirectGeocodeResult> = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        let mut seen = HashSet::new();
        let cities: Vec<City> = results
            .into_iter()
            .map(|r| City::new(r.name, r.country.unwrap_or_default(), r.lat, r.lon))
            .filter(|c| seen.insert(c.key()))
            .collect();

        tracing::debug!("Found {} candidates for '{}'", cities.len(), query);
        Ok(cities)
    }
}
