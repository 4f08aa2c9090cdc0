//! The saved-locations store.
//!
//! The whole list lives in one persisted JSON array under a single key. Every
//! operation is an independent read-modify-write of that value; there is no
//! in-memory copy kept between calls.

use std::collections::HashSet;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::city::{City, LocationKey};
use crate::kv::{KeyValueStore, KvError};

/// Key the list is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "saved_locations";

/// Saved-locations store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(#[from] KvError),

    /// A value is stored but is not a valid list of cities
    #[error("Saved locations are corrupt: {0}")]
    CorruptStore(#[source] serde_json::Error),

    #[error("Failed to encode saved locations: {0}")]
    Encode(#[source] serde_json::Error),

    /// Rejected before writing; nothing was persisted
    #[error("Invalid coordinates for {name}: ({lat}, {lon})")]
    InvalidCoordinates { name: String, lat: f64, lon: f64 },
}

fn check_coords(city: &City) -> Result<(), StoreError> {
    if city.has_valid_coords() {
        Ok(())
    } else {
        Err(StoreError::InvalidCoordinates {
            name: city.name.clone(),
            lat: city.lat,
            lon: city.lon,
        })
    }
}

/// Result of [`SavedLocations::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// A city with the same coordinates is already saved; nothing was written
    AlreadyExists,
}

/// Result of [`SavedLocations::remove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

/// Ordered, deduplicated list of saved cities over a key-value backend.
///
/// Mutations through one instance are serialized, so concurrent tasks sharing
/// it cannot overwrite each other's changes. Separate instances over the same
/// backend are still last-write-wins.
#[derive(Debug)]
pub struct SavedLocations<S> {
    backend: S,
    key: String,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> SavedLocations<S> {
    pub fn new(backend: S) -> Self {
        Self::with_key(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// All saved cities in their persisted order.
    ///
    /// # Errors
    /// `CorruptStore` if the stored value does not parse, `Persistence` if the
    /// backend fails. An absent value is an empty list.
    pub async fn list(&self) -> Result<Vec<City>, StoreError> {
        self.read().await
    }

    /// Append `city` unless one with the same [`LocationKey`] is saved.
    ///
    /// # Errors
    /// `InvalidCoordinates` for non-finite or out-of-range coordinates,
    /// otherwise propagates read and write failures.
    pub async fn add(&self, city: City) -> Result<AddOutcome, StoreError> {
        check_coords(&city)?;
        let _guard = self.write_lock.lock().await;
        let mut saved = self.read().await?;

        let key = city.key();
        if saved.iter().any(|c| c.key() == key) {
            tracing::info!("Location already saved: {}", city.name);
            return Ok(AddOutcome::AlreadyExists);
        }

        let name = city.name.clone();
        saved.push(city);
        self.write(&saved).await?;

        tracing::info!("Location saved: {}", name);
        Ok(AddOutcome::Added)
    }

    /// Drop every entry sharing `city`'s key. Absent cities are a no-op.
    ///
    /// # Errors
    /// Propagates read and write failures.
    pub async fn remove(&self, city: &City) -> Result<RemoveOutcome, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut saved = self.read().await?;

        let key = city.key();
        let before = saved.len();
        saved.retain(|c| c.key() != key);

        if saved.len() == before {
            tracing::debug!("Location not saved, nothing to remove: {}", city.name);
            return Ok(RemoveOutcome::NotPresent);
        }

        self.write(&saved).await?;
        tracing::info!("Location removed: {}", city.name);
        Ok(RemoveOutcome::Removed)
    }

    /// Overwrite the list with `new_order` as given.
    ///
    /// The caller is trusted to pass a permutation of the current list; no
    /// reconciliation happens here.
    ///
    /// # Errors
    /// `InvalidCoordinates` if any entry could not be read back, otherwise
    /// propagates write failures.
    pub async fn reorder(&self, new_order: Vec<City>) -> Result<(), StoreError> {
        new_order.iter().try_for_each(check_coords)?;
        let _guard = self.write_lock.lock().await;
        self.write(&new_order).await?;
        tracing::info!("Locations order updated ({} entries)", new_order.len());
        Ok(())
    }

    /// Whether a city with the same key is saved.
    ///
    /// # Errors
    /// Same as [`SavedLocations::list`].
    pub async fn contains(&self, city: &City) -> Result<bool, StoreError> {
        let key = city.key();
        Ok(self.read().await?.iter().any(|c| c.key() == key))
    }

    /// Keys of every saved city, from a single read.
    ///
    /// Use this to mark a batch of candidates as saved instead of calling
    /// [`SavedLocations::contains`] once per candidate.
    ///
    /// # Errors
    /// Same as [`SavedLocations::list`].
    pub async fn saved_keys(&self) -> Result<HashSet<LocationKey>, StoreError> {
        Ok(self.read().await?.iter().map(City::key).collect())
    }

    /// Delete the persisted value; the next read sees an empty list.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.backend.remove(&self.key).await?;
        tracing::warn!("Saved locations reset");
        Ok(())
    }

    async fn read(&self) -> Result<Vec<City>, StoreError> {
        let Some(raw) = self.backend.get(&self.key).await? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&raw).map_err(|e| {
            tracing::error!("Stored value under '{}' is not a city list: {}", self.key, e);
            StoreError::CorruptStore(e)
        })
    }

    async fn write(&self, cities: &[City]) -> Result<(), StoreError> {
        let json = serde_json::to_string(cities).map_err(StoreError::Encode)?;
        self.backend.set(&self.key, &json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use std::sync::Arc;

    fn new_york() -> City {
        City {
            id: "40.71_-74.01".to_string(),
            name: "New York".to_string(),
            country: "US".to_string(),
            lat: 40.7128,
            lon: -74.006,
        }
    }

    fn london() -> City {
        City {
            id: "51.51_-0.13".to_string(),
            name: "London".to_string(),
            country: "GB".to_string(),
            lat: 51.5074,
            lon: -0.1278,
        }
    }

    fn names(cities: &[City]) -> Vec<&str> {
        cities.iter().map(|c| c.name.as_str()).collect()
    }

    /// Backend whose every call fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            Err(KvError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        async fn set(&self, key: &str, _value: &str) -> Result<(), KvError> {
            Err(KvError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }

        async fn remove(&self, _key: &str) -> Result<(), KvError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_add_rejects_non_finite_coordinates() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(london()).await.unwrap();

        for (lat, lon) in [(f64::NAN, 0.0), (0.0, f64::INFINITY), (f64::NEG_INFINITY, 1.0)] {
            let err = store.add(City::new("Nowhere", "", lat, lon)).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidCoordinates { .. }), "{:?}", err);
        }

        // Persisted list is untouched and still readable
        assert_eq!(names(&store.list().await.unwrap()), vec!["London"]);
    }

    #[tokio::test]
    async fn test_add_rejects_out_of_range_coordinates() {
        let store = SavedLocations::new(MemoryStore::new());
        let err = store.add(City::new("Nowhere", "", 91.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCoordinates { .. }));
        let err = store.add(City::new("Nowhere", "", 0.0, 180.5)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCoordinates { .. }));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nan_city_does_not_collide_with_origin() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(City::new("Null Island", "", 0.0, 0.0)).await.unwrap();

        let err = store
            .add(City::new("Nowhere", "", f64::NAN, f64::NAN))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCoordinates { .. }));
        assert_eq!(names(&store.list().await.unwrap()), vec!["Null Island"]);
    }

    #[tokio::test]
    async fn test_reorder_rejects_invalid_entry_without_writing() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(new_york()).await.unwrap();
        store.add(london()).await.unwrap();

        let err = store
            .reorder(vec![london(), City::new("Nowhere", "", f64::NAN, 0.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCoordinates { .. }));
        assert_eq!(names(&store.list().await.unwrap()), vec!["New York", "London"]);
    }

    #[tokio::test]
    async fn test_list_empty_when_absent() {
        let store = SavedLocations::new(MemoryStore::new());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_preserves_insertion_order() {
        let store = SavedLocations::new(MemoryStore::new());
        assert_eq!(store.add(new_york()).await.unwrap(), AddOutcome::Added);
        assert_eq!(store.add(london()).await.unwrap(), AddOutcome::Added);

        let saved = store.list().await.unwrap();
        assert_eq!(names(&saved), vec!["New York", "London"]);
        assert_eq!(saved[0], new_york());
    }

    #[tokio::test]
    async fn test_add_twice_keeps_one() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(new_york()).await.unwrap();
        assert_eq!(
            store.add(new_york()).await.unwrap(),
            AddOutcome::AlreadyExists
        );
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_detected_by_coordinates_not_id() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(new_york()).await.unwrap();

        let mut same_place = new_york();
        same_place.id = "3".to_string();
        same_place.lat = 40.712_800_000_01;
        assert_eq!(
            store.add(same_place).await.unwrap(),
            AddOutcome::AlreadyExists
        );

        let mut same_id = london();
        same_id.id = new_york().id;
        assert_eq!(store.add(same_id).await.unwrap(), AddOutcome::Added);
    }

    #[tokio::test]
    async fn test_remove_keeps_survivor_order() {
        let store = SavedLocations::new(MemoryStore::new());
        let paris = City::new("Paris", "FR", 48.8566, 2.3522);
        store.add(new_york()).await.unwrap();
        store.add(london()).await.unwrap();
        store.add(paris.clone()).await.unwrap();

        assert_eq!(
            store.remove(&london()).await.unwrap(),
            RemoveOutcome::Removed
        );
        assert_eq!(names(&store.list().await.unwrap()), vec!["New York", "Paris"]);
    }

    #[tokio::test]
    async fn test_remove_matches_by_coordinates() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(new_york()).await.unwrap();

        // Same place, different id derivation
        let lookup = City::new("NYC", "US", 40.7128, -74.006);
        assert_eq!(store.remove(&lookup).await.unwrap(), RemoveOutcome::Removed);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(new_york()).await.unwrap();

        assert_eq!(
            store.remove(&london()).await.unwrap(),
            RemoveOutcome::NotPresent
        );
        assert_eq!(
            store.remove(&london()).await.unwrap(),
            RemoveOutcome::NotPresent
        );
        assert_eq!(names(&store.list().await.unwrap()), vec!["New York"]);
    }

    #[tokio::test]
    async fn test_reorder_overwrites_verbatim() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(new_york()).await.unwrap();
        store.add(london()).await.unwrap();

        store.reorder(vec![london(), new_york()]).await.unwrap();
        assert_eq!(names(&store.list().await.unwrap()), vec!["London", "New York"]);

        // Not validated as a permutation
        let tokyo = City::new("Tokyo", "JP", 35.6762, 139.6503);
        store.reorder(vec![tokyo]).await.unwrap();
        assert_eq!(names(&store.list().await.unwrap()), vec!["Tokyo"]);
    }

    #[tokio::test]
    async fn test_contains_and_saved_keys() {
        let store = SavedLocations::new(MemoryStore::new());
        store.add(new_york()).await.unwrap();

        assert!(store.contains(&new_york()).await.unwrap());
        assert!(!store.contains(&london()).await.unwrap());

        let keys = store.saved_keys().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&LocationKey::from_coords(40.7128, -74.006)));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_surfaced() {
        let backend = MemoryStore::new();
        backend.set(DEFAULT_STORAGE_KEY, "{not json").await.unwrap();
        let store = SavedLocations::new(backend.clone());

        assert!(matches!(
            store.list().await.unwrap_err(),
            StoreError::CorruptStore(_)
        ));
        assert!(matches!(
            store.add(new_york()).await.unwrap_err(),
            StoreError::CorruptStore(_)
        ));
        // The corrupt value is left untouched for the caller to decide
        assert_eq!(
            backend.get(DEFAULT_STORAGE_KEY).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn test_wrong_shape_is_corrupt() {
        let backend = MemoryStore::new();
        backend
            .set(DEFAULT_STORAGE_KEY, r#"[{"name":"No coords"}]"#)
            .await
            .unwrap();
        let store = SavedLocations::new(backend);
        assert!(matches!(
            store.list().await.unwrap_err(),
            StoreError::CorruptStore(_)
        ));
    }

    #[tokio::test]
    async fn test_reset_recovers_from_corruption() {
        let backend = MemoryStore::new();
        backend.set(DEFAULT_STORAGE_KEY, "garbage").await.unwrap();
        let store = SavedLocations::new(backend);

        store.reset().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        store.add(london()).await.unwrap();
        assert_eq!(names(&store.list().await.unwrap()), vec!["London"]);
    }

    #[tokio::test]
    async fn test_custom_key_is_isolated() {
        let backend = MemoryStore::new();
        let a = SavedLocations::with_key(backend.clone(), "a");
        let b = SavedLocations::with_key(backend, "b");
        a.add(new_york()).await.unwrap();
        assert!(b.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_is_persistence_error() {
        let store = SavedLocations::new(BrokenStore);
        assert!(matches!(
            store.list().await.unwrap_err(),
            StoreError::Persistence(KvError::Io { .. })
        ));
        assert!(matches!(
            store.reorder(vec![london()]).await.unwrap_err(),
            StoreError::Persistence(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_adds_on_shared_instance_all_land() {
        let store = Arc::new(SavedLocations::new(MemoryStore::new()));
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let city = City::new(format!("City {}", i), "XX", i as f64, i as f64);
                store.add(city).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), AddOutcome::Added);
        }
        assert_eq!(store.list().await.unwrap().len(), 20);
    }
}
