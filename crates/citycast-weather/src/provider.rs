//! Current conditions from the OpenWeatherMap `/data/2.5/weather` endpoint.

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::http::{build_client, error_for_response, join_url};
use crate::types::{CurrentWeather, WeatherError};
use citycast_core::UnitSystem;
use citycast_locations::City;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Deserialize)]
struct OwmResponse {
    #[serde(default)]
    weather: Vec<OwmCondition>,
    main: OwmMain,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    timezone: i32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    sys: Option<OwmSys>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    country: Option<String>,
}

impl OwmResponse {
    fn into_current(self, units: UnitSystem) -> CurrentWeather {
        let (description, icon) = self
            .weather
            .into_iter()
            .next()
            .map(|c| (c.description, c.icon))
            .unwrap_or_default();
        let (wind_speed, wind_deg) = self
            .wind
            .map(|w| (w.speed, w.deg))
            .unwrap_or((0.0, None));

        CurrentWeather {
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            humidity: self.main.humidity,
            description,
            icon,
            wind_speed,
            wind_deg,
            timezone_offset: self.timezone,
            place_name: self.name,
            country: self.sys.and_then(|s| s.country),
            units,
            fetched_at: Utc::now(),
        }
    }
}

/// Client for current weather conditions
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, WeatherError> {
        Self::with_base_url(api_key, OPENWEATHER_BASE_URL)
    }

    /// Point the provider at another host (a mock server in tests)
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        Ok(Self {
            client: Arc::new(build_client()?),
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Fetch current conditions at a coordinate.
    ///
    /// # Errors
    /// `MissingApiKey` without a key, `InvalidApiKey` on 401,
    /// `LocationNotFound` on 404, `Api` for other failures, `Network` and
    /// `Parse` for transport and body problems. Nothing is retried.
    pub async fn fetch_current(
        &self,
        lat: f64,
        lon: f64,
        units: UnitSystem,
    ) -> Result<CurrentWeather, WeatherError> {
        if self.api_key.trim().is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let url = join_url(&self.base_url, "data/2.5/weather");
        tracing::debug!("Fetching weather for {}, {} ({})", lat, lon, units);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("units", units.as_query().to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response, &format!("{}, {}", lat, lon)).await);
        }

        let body: OwmResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        Ok(body.into_current(units))
    }

    /// Fetch current conditions for a saved city
    ///
    /// # Errors
    /// Same as [`WeatherProvider::fetch_current`].
    pub async fn fetch_for_city(
        &self,
        city: &City,
        units: UnitSystem,
    ) -> Result<CurrentWeather, WeatherError> {
        let mut weather = self.fetch_current(city.lat, city.lon, units).await?;
        if weather.place_name.is_empty() {
            weather.place_name = city.name.clone();
        }
        Ok(weather)
    }
}
