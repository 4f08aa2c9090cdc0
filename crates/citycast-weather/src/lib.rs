//! Weather services for citycast
//!
//! Current conditions from OpenWeatherMap, city search via its geocoding
//! endpoint, background photos from Unsplash with a session-scoped cache,
//! plus the display and search-as-you-type helpers the front end needs.

pub mod display;
pub mod geocode;
mod http;
pub mod photo;
pub mod provider;
pub mod search;
pub mod types;

pub use citycast_core::UnitSystem;
pub use geocode::GeocodeClient;
pub use photo::{PhotoCache, PhotoClient};
pub use provider::WeatherProvider;
pub use search::{should_search, Debouncer};
pub use types::*;
