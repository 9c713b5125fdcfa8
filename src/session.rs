//! Signed-in account state and small device preferences.
//!
//! `AuthSession` is created once at app start with [`AuthSession::init`],
//! shared by `Arc`, and cleared with [`AuthSession::logout`]. Nothing here
//! is a global.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::store::{KeyValueStore, keys};

/// The account the token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Shape of the persisted `auth` blob.
#[derive(Serialize, Deserialize)]
struct StoredAuth {
    token: String,
    #[serde(default)]
    user: Option<UserSummary>,
}

struct SignedIn {
    token: SecretString,
    user: Option<UserSummary>,
}

/// Bearer-token session backed by the device key-value store.
pub struct AuthSession {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<Option<SignedIn>>,
}

impl AuthSession {
    /// Restore the session persisted by a previous run, if any.
    ///
    /// A blob that no longer parses is discarded rather than failing start-up.
    pub async fn init(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let restored = match store.get(keys::AUTH).await? {
            Some(raw) => match serde_json::from_str::<StoredAuth>(&raw) {
                Ok(stored) if !stored.token.trim().is_empty() => Some(SignedIn {
                    token: SecretString::from(stored.token),
                    user: stored.user,
                }),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Discarding unreadable auth blob: {}", e);
                    store.remove(keys::AUTH).await?;
                    None
                }
            },
            None => None,
        };

        if restored.is_some() {
            tracing::debug!("Restored signed-in session");
        }

        Ok(Self {
            store,
            state: RwLock::new(restored),
        })
    }

    /// Persist a freshly issued token.
    pub async fn login(&self, token: &str, user: Option<UserSummary>) -> Result<(), StorageError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(StorageError::InvalidValue {
                key: keys::AUTH.into(),
                message: "token must not be empty".into(),
            });
        }

        let blob = serde_json::to_string(&StoredAuth {
            token: token.to_string(),
            user: user.clone(),
        })
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(keys::AUTH, &blob).await?;

        *self.state.write().await = Some(SignedIn {
            token: SecretString::from(token.to_string()),
            user,
        });
        tracing::info!("Signed in");
        Ok(())
    }

    /// Forget the token, on disk and in memory.
    pub async fn logout(&self) -> Result<(), StorageError> {
        self.store.remove(keys::AUTH).await?;
        *self.state.write().await = None;
        tracing::info!("Signed out");
        Ok(())
    }

    pub async fn token(&self) -> Option<SecretString> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| SecretString::from(s.token.expose_secret().to_string()))
    }

    pub async fn user(&self) -> Option<UserSummary> {
        self.state.read().await.as_ref().and_then(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }
}

/// Small persisted app preferences.
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn delivery_pincode(&self) -> Result<Option<String>, StorageError> {
        self.store.get(keys::DELIVERY_PINCODE).await
    }

    /// Indian postal code: six digits, not starting with 0.
    pub async fn set_delivery_pincode(&self, pincode: &str) -> Result<(), StorageError> {
        let pincode = pincode.trim();
        let valid = pincode.len() == 6
            && pincode.chars().all(|c| c.is_ascii_digit())
            && !pincode.starts_with('0');
        if !valid {
            return Err(StorageError::InvalidValue {
                key: keys::DELIVERY_PINCODE.into(),
                message: format!("{pincode:?} is not a 6-digit pincode"),
            });
        }
        self.store.set(keys::DELIVERY_PINCODE, pincode).await
    }

    pub async fn clear_delivery_pincode(&self) -> Result<bool, StorageError> {
        self.store.remove(keys::DELIVERY_PINCODE).await
    }
}
