//! Error types for the bbscart client core.

/// Generic alert text shown when the backend gives no message of its own.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Key-value persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the remote backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("{endpoint} requires a draft id")]
    MissingDraftId { endpoint: String },

    #[error("Could not read attachment {name}: {reason}")]
    Attachment { name: String, reason: String },
}

/// Onboarding wizard errors.
///
/// Every variant is surfaced to the user as a single alert message, see
/// [`OnboardingError::user_message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingError {
    /// A required field is empty. `field` is the first missing key.
    #[error("Validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Saving step failed: {0}")]
    StepSave(String),

    #[error("Submitting application failed: {0}")]
    Submit(String),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No draft application exists yet")]
    NoDraft,

    #[error("Application already submitted")]
    AlreadySubmitted,

    #[error("Storage failed: {0}")]
    Storage(String),

    /// The wizard was reset, or left the step, while the request ran.
    #[error("Reply arrived after the wizard moved on")]
    Superseded,
}

impl OnboardingError {
    /// The text shown in the one-shot alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Upload(msg) | Self::StepSave(msg) | Self::Submit(msg) => msg.clone(),
            Self::NoDraft => "Please complete the earlier steps first.".to_string(),
            Self::AlreadySubmitted => "This application has already been submitted.".to_string(),
            Self::InvalidTransition { .. } | Self::Storage(_) | Self::Superseded => {
                FALLBACK_MESSAGE.to_string()
            }
        }
    }
}

impl From<StorageError> for OnboardingError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Cart and wishlist mirror errors.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Server rejected {action}: {message}")]
    Rejected { action: String, message: String },

    #[error("Invalid quantity {0}")]
    InvalidQuantity(u32),

    #[error("Product {0} is not in the cart")]
    NotInCart(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}
