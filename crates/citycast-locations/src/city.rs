use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places kept when normalizing coordinates (about 11 m at the equator)
pub const COORD_PRECISION: usize = 4;

const COORD_SCALE: f64 = 10_000.0;

/// Canonical uniqueness key for a saved city.
///
/// Coordinates are rounded to [`COORD_PRECISION`] decimal places and held as
/// integers, so equality and hashing are exact and immune to float noise
/// such as `40.71280000001` vs `40.7128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    lat: i64,
    lon: i64,
}

impl LocationKey {
    pub fn from_coords(lat: f64, lon: f64) -> Self {
        Self {
            lat: normalize(lat),
            lon: normalize(lon),
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat as f64 / COORD_SCALE
    }

    pub fn lon(&self) -> f64 {
        self.lon as f64 / COORD_SCALE
    }
}

fn normalize(value: f64) -> i64 {
    // `as` saturates and maps NaN to 0; rounding also folds -0.0 into 0
    (value * COORD_SCALE).round() as i64
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.prec$}_{:.prec$}",
            self.lat(),
            self.lon(),
            prec = COORD_PRECISION
        )
    }
}

/// A named geographic point a user can save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Opaque identifier. Never used for equality; see [`City::key`].
    pub id: String,
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl City {
    /// Build a city whose id is derived from its normalized coordinates
    pub fn new(name: impl Into<String>, country: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: LocationKey::from_coords(lat, lon).to_string(),
            name: name.into(),
            country: country.into(),
            lat,
            lon,
        }
    }

    /// The key used for de-duplication, lookup and removal
    pub fn key(&self) -> LocationKey {
        LocationKey::from_coords(self.lat, self.lon)
    }

    /// Both coordinates are finite and within latitude/longitude range.
    ///
    /// Only such cities can be persisted: JSON has no NaN or infinity.
    pub fn has_valid_coords(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// "Name, Country", or just the name when the country is unknown
    pub fn display_name(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_derives_canonical_id() {
        let city = City::new("New York", "US", 40.7128, -74.006);
        assert_eq!(city.id, "40.7128_-74.0060");
    }

    #[test]
    fn test_key_ignores_float_noise() {
        let a = LocationKey::from_coords(40.7128, -74.006);
        let b = LocationKey::from_coords(40.712_800_000_01, -74.005_999_999_99);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_nearby_points() {
        let a = LocationKey::from_coords(51.5074, -0.1278);
        let b = LocationKey::from_coords(51.5075, -0.1278);
        assert_ne!(a, b);
    }

    #[test]
    fn test_negative_zero_normalizes() {
        let a = LocationKey::from_coords(0.0, -0.0);
        let b = LocationKey::from_coords(-0.0, 0.0);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0.0000_0.0000");
    }

    #[test]
    fn test_key_ignores_id() {
        let mut a = City::new("London", "GB", 51.5074, -0.1278);
        let b = City::new("London", "GB", 51.5074, -0.1278);
        a.id = "7".to_string();
        assert_eq!(a.key(), b.key());

        let keys: HashSet<_> = [a.key(), b.key()].into_iter().collect();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(City::new("Null Island", "", 0.0, 0.0).has_valid_coords());
        assert!(City::new("Pole", "", 90.0, -180.0).has_valid_coords());
        assert!(!City::new("Nowhere", "", f64::NAN, 0.0).has_valid_coords());
        assert!(!City::new("Nowhere", "", 0.0, f64::INFINITY).has_valid_coords());
        assert!(!City::new("Nowhere", "", 90.5, 0.0).has_valid_coords());
        assert!(!City::new("Nowhere", "", 0.0, -180.1).has_valid_coords());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(City::new("Paris", "FR", 48.8566, 2.3522).display_name(), "Paris, FR");
        assert_eq!(City::new("Atlantis", "", 0.0, 0.0).display_name(), "Atlantis");
    }

    #[test]
    fn test_city_json_shape() {
        let city = City::new("London", "GB", 51.5074, -0.1278);
        let json = serde_json::to_value(&city).unwrap();
        assert_eq!(json["id"], "51.5074_-0.1278");
        assert_eq!(json["name"], "London");
        assert_eq!(json["country"], "GB");
        assert_eq!(json["lat"], 51.5074);
        assert_eq!(json["lon"], -0.1278);
    }
}
