//! Maps library errors to citycast_core::AppError for consistent user-facing messages.
//! Neither side is local to this crate, so conversions are extension traits
//! rather than `From` impls.

mod store;
mod weather;

pub use store::StoreErrorExt;
pub use weather::WeatherErrorExt;
