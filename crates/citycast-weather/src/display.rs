//! Client-side formatting: unit conversion, temperature colors, icon URLs
//! and local wall-clock time.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use citycast_core::UnitSystem;

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";
const KELVIN_OFFSET: f64 = 273.15;
const METERS_PER_SECOND_PER_MPH: f64 = 0.44704;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Express a temperature given in `units` in Celsius
pub fn to_celsius(temp: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => temp,
        UnitSystem::Imperial => fahrenheit_to_celsius(temp),
        UnitSystem::Standard => temp - KELVIN_OFFSET,
    }
}

/// Express a Celsius temperature in `units`
pub fn from_celsius(celsius: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => celsius,
        UnitSystem::Imperial => celsius_to_fahrenheit(celsius),
        UnitSystem::Standard => celsius + KELVIN_OFFSET,
    }
}

pub fn convert_temperature(temp: f64, from: UnitSystem, to: UnitSystem) -> f64 {
    if from == to {
        return temp;
    }
    from_celsius(to_celsius(temp, from), to)
}

/// Convert between m/s (metric, standard) and mph (imperial)
pub fn convert_wind_speed(speed: f64, from: UnitSystem, to: UnitSystem) -> f64 {
    match (from, to) {
        (UnitSystem::Imperial, UnitSystem::Imperial) => speed,
        (UnitSystem::Imperial, _) => speed * METERS_PER_SECOND_PER_MPH,
        (_, UnitSystem::Imperial) => speed / METERS_PER_SECOND_PER_MPH,
        _ => speed,
    }
}

/// Background color for a temperature, banded on its Celsius value
pub fn temperature_color(temp: f64, units: UnitSystem) -> &'static str {
    let celsius = to_celsius(temp, units);
    if celsius <= 0.0 {
        "#00FFFF" // freezing
    } else if celsius <= 10.0 {
        "#87CEEB"
    } else if celsius <= 20.0 {
        "#FFFFFF"
    } else if celsius <= 25.0 {
        "#FFE4B5"
    } else if celsius <= 30.0 {
        "#FFA500"
    } else {
        "#FF4500" // very hot
    }
}

/// Rounded temperature with its unit symbol, e.g. "21°C"
pub fn format_temperature(temp: f64, units: UnitSystem) -> String {
    // Adding 0.0 folds a rounded -0 into 0
    let rounded = temp.round() + 0.0;
    format!("{}{}", rounded, units.temperature_symbol())
}

pub fn icon_url(icon: &str) -> String {
    format!("{}/{}@4x.png", ICON_BASE_URL, icon)
}

/// Wall-clock time at a location `offset_secs` from UTC, e.g. "3:07 PM"
pub fn local_time(offset_secs: i32, now: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(offset_secs).unwrap_or_else(|| {
        tracing::warn!("Ignoring out-of-range timezone offset {}s", offset_secs);
        Utc.fix()
    });
    now.with_timezone(&offset).format("%-I:%M %p").to_string()
}

/// 8-point compass direction for a wind bearing in degrees
pub fn compass_direction(degrees: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let normalized = degrees.rem_euclid(360.0);
    let index = ((normalized / 45.0).round() as usize) % POINTS.len();
    POINTS[index]
}
