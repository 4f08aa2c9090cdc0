//! Command handlers. Each returns the text to print on success.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::Utc;
use citycast_core::{AppError, Config, UnitSystem};
use citycast_locations::{AddOutcome, City, KeyValueStore, RemoveOutcome, SavedLocations};
use citycast_weather::display::{compass_direction, format_temperature, local_time};
use citycast_weather::search::should_search_with;
use citycast_weather::{CurrentWeather, GeocodeClient, PhotoCache, PhotoClient, WeatherProvider};

use crate::error_mapping::{StoreErrorExt, WeatherErrorExt};
use crate::selection::{find_city, parse_permutation, pick_candidate};

/// Configuration, the saved-locations store and session caches for one run
pub struct Session<S> {
    config: Config,
    store: SavedLocations<S>,
    photos: PhotoCache,
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(config: Config, backend: S) -> Self {
        let store = SavedLocations::with_key(backend, config.storage.key.clone());
        Self {
            config,
            store,
            photos: PhotoCache::new(),
        }
    }

    pub async fn list(&self, with_weather: bool, units: Option<UnitSystem>) -> Result<String> {
        let cities = self.saved().await?;
        if cities.is_empty() {
            return Ok("No saved locations. Use `citycast add <city>` to save one.".to_string());
        }

        let provider = if with_weather {
            Some(self.weather_provider()?)
        } else {
            None
        };
        let units = units.unwrap_or(self.config.weather.units);

        let mut out = String::new();
        for (i, city) in cities.iter().enumerate() {
            let _ = write!(out, "{:>2}. {}", i + 1, describe(city));
            if let Some(provider) = &provider {
                match provider.fetch_for_city(city, units).await {
                    Ok(weather) => {
                        let _ = write!(
                            out,
                            "  {}  {}",
                            format_temperature(weather.temperature, weather.units),
                            weather.description
                        );
                    }
                    Err(e) => {
                        tracing::warn!("Weather for {} unavailable: {}", city.name, e);
                        out.push_str("  (weather unavailable)");
                    }
                }
            }
            out.push('\n');
        }
        Ok(out.trim_end().to_string())
    }

    pub async fn search(&self, query: &str) -> Result<String> {
        let candidates = self.geocode(query).await?;
        if candidates.is_empty() {
            return Ok(format!("No cities found for '{}'", query.trim()));
        }

        let saved = self.store.saved_keys().await.map_err(StoreErrorExt::into_app_error)?;

        let mut out = String::new();
        for (i, city) in candidates.iter().enumerate() {
            let marker = if saved.contains(&city.key()) {
                "  [saved]"
            } else {
                ""
            };
            let _ = writeln!(out, "{:>2}. {}{}", i + 1, describe(city), marker);
        }
        Ok(out.trim_end().to_string())
    }

    pub async fn add(&self, query: &str, pick: usize) -> Result<String> {
        let candidates = self.geocode(query).await?;
        let city = pick_candidate(candidates, pick, query.trim())?;
        let name = city.display_name();

        match self.store.add(city).await.map_err(StoreErrorExt::into_app_error)? {
            AddOutcome::Added => Ok(format!("Saved {}", name)),
            AddOutcome::AlreadyExists => Ok(format!("{} is already saved", name)),
        }
    }

    pub async fn remove(&self, query: &str) -> Result<String> {
        let cities = self.saved().await?;
        let city = find_city(&cities, query)?;

        match self.store.remove(city).await.map_err(StoreErrorExt::into_app_error)? {
            RemoveOutcome::Removed => Ok(format!("Removed {}", city.display_name())),
            RemoveOutcome::NotPresent => Ok(format!("{} was not saved", city.display_name())),
        }
    }

    pub async fn reorder(&self, positions: &[usize]) -> Result<String> {
        let cities = self.saved().await?;
        let order = parse_permutation(positions, cities.len())?;
        let reordered: Vec<City> = order.into_iter().map(|i| cities[i].clone()).collect();

        let names: Vec<String> = reordered.iter().map(|c| c.name.clone()).collect();
        self.store
            .reorder(reordered)
            .await
            .map_err(StoreErrorExt::into_app_error)?;
        Ok(format!("New order: {}", names.join(", ")))
    }

    pub async fn weather(
        &self,
        query: &str,
        units: Option<UnitSystem>,
        with_photo: bool,
    ) -> Result<String> {
        let cities = self.saved().await?;
        let city = find_city(&cities, query)?;
        let units = units.unwrap_or(self.config.weather.units);

        let weather = self
            .weather_provider()?
            .fetch_for_city(city, units)
            .await
            .map_err(WeatherErrorExt::into_app_error)?;

        let mut out = render_weather(city, &weather);

        if with_photo {
            match self.photo_client()? {
                Some(client) => match client.image_for(&self.photos, &city.name).await {
                    Some(url) => {
                        let _ = write!(out, "\nPhoto:       {}", url);
                    }
                    None => out.push_str("\nPhoto:       none found"),
                },
                None => out.push_str("\nPhoto:       disabled (no Unsplash access key)"),
            }
        }

        Ok(out)
    }

    pub async fn reset(&self) -> Result<String> {
        self.store.reset().await.map_err(StoreErrorExt::into_app_error)?;
        Ok("Saved locations cleared".to_string())
    }

    async fn saved(&self) -> Result<Vec<City>, AppError> {
        self.store.list().await.map_err(StoreErrorExt::into_app_error)
    }

    async fn geocode(&self, query: &str) -> Result<Vec<City>, AppError> {
        let min_len = self.config.search.min_query_len;
        if !should_search_with(query, min_len) {
            return Err(AppError::Service(format!(
                "Enter at least {} characters to search",
                min_len
            )));
        }

        let client = GeocodeClient::with_base_url(self.weather_key(), &self.config.geocoding.base_url)
            .map_err(WeatherErrorExt::into_app_error)?
            .with_limit(self.config.geocoding.result_limit)
            .with_min_query_len(min_len);

        client
            .search(query)
            .await
            .map_err(WeatherErrorExt::into_app_error)
    }

    fn weather_provider(&self) -> Result<WeatherProvider, AppError> {
        WeatherProvider::with_base_url(self.weather_key(), &self.config.weather.base_url)
            .map_err(WeatherErrorExt::into_app_error)
    }

    fn photo_client(&self) -> Result<Option<PhotoClient>, AppError> {
        let photos = &self.config.photos;
        let key = match photos.access_key.as_deref() {
            Some(key) if photos.enabled && !key.is_empty() => key,
            _ => return Ok(None),
        };
        PhotoClient::with_base_url(key, &photos.base_url)
            .map(Some)
            .map_err(WeatherErrorExt::into_app_error)
    }

    fn weather_key(&self) -> String {
        self.config.weather.api_key.clone().unwrap_or_default()
    }
}

fn describe(city: &City) -> String {
    format!("{} ({:.4}, {:.4})", city.display_name(), city.lat, city.lon)
}

fn render_weather(city: &City, weather: &CurrentWeather) -> String {
    let units = weather.units;
    let wind = match weather.wind_deg {
        Some(deg) => format!(
            "{:.1} {} {}",
            weather.wind_speed,
            units.wind_speed_symbol(),
            compass_direction(deg)
        ),
        None => format!("{:.1} {}", weather.wind_speed, units.wind_speed_symbol()),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", city.display_name());
    let _ = writeln!(out, "Local time:  {}", local_time(weather.timezone_offset, Utc::now()));
    let _ = writeln!(
        out,
        "Now:         {}  {}",
        format_temperature(weather.temperature, units),
        weather.description
    );
    let _ = writeln!(out, "Feels like:  {}", format_temperature(weather.feels_like, units));
    let _ = writeln!(
        out,
        "Low / high:  {} / {}",
        format_temperature(weather.temp_min, units),
        format_temperature(weather.temp_max, units)
    );
    let _ = writeln!(out, "Humidity:    {}%", weather.humidity);
    let _ = writeln!(out, "Wind:        {}", wind);
    let _ = writeln!(out, "Background:  {}", weather.temperature_color());
    let _ = write!(out, "Icon:        {}", weather.icon_url());
    out
}
