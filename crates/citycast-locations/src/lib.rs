//! Saved locations for citycast
//!
//! Provides the City model, its canonical coordinate key, key-value
//! persistence backends, and the ordered, deduplicated saved-locations store.

pub mod city;
pub mod kv;
pub mod store;

pub use city::{City, LocationKey};
pub use kv::{FileStore, KeyValueStore, KvError, MemoryStore};
pub use store::{AddOutcome, RemoveOutcome, SavedLocations, StoreError, DEFAULT_STORAGE_KEY};
