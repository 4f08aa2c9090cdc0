//! City background photos from the Unsplash search API.
//!
//! Lookups go through a [`PhotoCache`] owned by the caller for the length of a
//! session; nothing is persisted and there is no global cache.

use parking_lot::Mutex;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::http::{build_client, error_for_response, join_url};
use crate::types::WeatherError;

pub const UNSPLASH_BASE_URL: &str = "https://api.unsplash.com";

#[derive(Debug, Deserialize)]
struct PhotoSearchResponse {
    #[serde(default)]
    results: Vec<PhotoResult>,
}

#[derive(Debug, Deserialize)]
struct PhotoResult {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

/// Image URLs by city name for the current session
#[derive(Debug, Default)]
pub struct PhotoCache {
    urls: Mutex<HashMap<String, String>>,
}

impl PhotoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, city_name: &str) -> Option<String> {
        self.urls.lock().get(city_name).cloned()
    }

    pub fn insert(&self, city_name: impl Into<String>, url: impl Into<String>) {
        self.urls.lock().insert(city_name.into(), url.into());
    }

    pub fn len(&self) -> usize {
        self.urls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.urls.lock().clear();
    }
}

#[derive(Debug, Clone)]
pub struct PhotoClient {
    client: Arc<Client>,
    base_url: String,
    access_key: String,
}

impl PhotoClient {
    pub fn new(access_key: impl Into<String>) -> Result<Self, WeatherError> {
        Self::with_base_url(access_key, UNSPLASH_BASE_URL)
    }

    pub fn with_base_url(
        access_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        Ok(Self {
            client: Arc::new(build_client()?),
            base_url: base_url.into(),
            access_key: access_key.into(),
        })
    }

    /// One representative image URL for `city_name`, served from `cache`
    /// when possible. Failures are logged and yield `None`.
    pub async fn image_for(&self, cache: &PhotoCache, city_name: &str) -> Option<String> {
        if let Some(url) = cache.get(city_name) {
            return Some(url);
        }

        match self.search(city_name).await {
            Ok(Some(url)) => {
                cache.insert(city_name, url.clone());
                Some(url)
            }
            Ok(None) => {
                tracing::debug!("No photo found for {}", city_name);
                None
            }
            Err(e) => {
                tracing::warn!("Photo lookup for {} failed: {}", city_name, e);
                None
            }
        }
    }

    /// Query the photo service directly, bypassing any cache.
    ///
    /// # Errors
    /// `MissingApiKey`, `InvalidApiKey`, `Api`, `Network` or `Parse`.
    pub async fn search(&self, city_name: &str) -> Result<Option<String>, WeatherError> {
        if self.access_key.trim().is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let url = join_url(&self.base_url, "search/photos");
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Client-ID {}", self.access_key))
            .query(&[
                ("query", format!("{} city landmark", city_name)),
                ("per_page", "1".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response, city_name).await);
        }

        let body: PhotoSearchResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        Ok(body.results.into_iter().next().map(|r| r.urls.regular))
    }
}
