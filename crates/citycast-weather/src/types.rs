use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display;
use citycast_core::UnitSystem;

/// Current weather conditions at a point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Relative humidity, percent
    pub humidity: u8,
    pub description: String,
    /// Service icon identifier, e.g. "01d"
    pub icon: String,
    pub wind_speed: f64,
    /// Meteorological wind direction in degrees, when reported
    pub wind_deg: Option<f64>,
    /// Offset of the location's local time from UTC, in seconds
    pub timezone_offset: i32,
    /// Place name as reported by the service
    pub place_name: String,
    pub country: Option<String>,
    /// Units the numeric fields are expressed in
    pub units: UnitSystem,
    pub fetched_at: DateTime<Utc>,
}

impl CurrentWeather {
    /// Re-express temperatures and wind speed in `units`.
    ///
    /// Used to toggle between Celsius and Fahrenheit without refetching.
    pub fn in_units(&self, units: UnitSystem) -> Self {
        let temp = |t: f64| display::convert_temperature(t, self.units, units);
        Self {
            temperature: temp(self.temperature),
            feels_like: temp(self.feels_like),
            temp_min: temp(self.temp_min),
            temp_max: temp(self.temp_max),
            wind_speed: display::convert_wind_speed(self.wind_speed, self.units, units),
            units,
            ..self.clone()
        }
    }

    /// Background color for the temperature tile
    pub fn temperature_color(&self) -> &'static str {
        display::temperature_color(self.temperature, self.units)
    }

    pub fn icon_url(&self) -> String {
        display::icon_url(&self.icon)
    }
}

/// Weather, geocoding and photo client errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API key is not configured")]
    MissingApiKey,

    #[error("API key was rejected")]
    InvalidApiKey,

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}
