//! `KeyValueStore` trait: the device key-value persistence collaborator.

use async_trait::async_trait;

use crate::error::StorageError;

/// Flat string key/value persistence.
///
/// Holds the onboarding draft ids and a handful of app preferences. There is
/// no schema beyond the keys in [`super::keys`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys return `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Returns whether anything was removed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}
