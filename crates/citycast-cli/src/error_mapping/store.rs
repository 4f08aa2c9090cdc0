use citycast_core::{AppError, StorageError};
use citycast_locations::StoreError;

pub trait StoreErrorExt {
    fn into_app_error(self) -> AppError;
}

impl StoreErrorExt for StoreError {
    fn into_app_error(self) -> AppError {
        match self {
            StoreError::Persistence(e) => AppError::Storage(StorageError::Unavailable(e.to_string())),
            StoreError::CorruptStore(e) => AppError::Storage(StorageError::Corruption(e.to_string())),
            StoreError::Encode(e) => AppError::Storage(StorageError::Unavailable(format!(
                "could not encode saved locations: {}",
                e
            ))),
            e @ StoreError::InvalidCoordinates { .. } => AppError::Service(e.to_string()),
        }
    }
}
