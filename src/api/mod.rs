//! Backend collaborator: the REST/JSON API at `https://bbscart.com/api`.
//!
//! The controllers only see the traits below; `HttpApi` is the `reqwest`
//! implementation and tests plug in stubs.

pub mod http;
pub mod types;

pub use http::HttpApi;
pub use types::{ApiResponse, DraftRef, UploadedFile};

use async_trait::async_trait;
use serde_json::Value;

use crate::attachments::LocalFile;
use crate::cart::CartLine;
use crate::error::ApiError;
use crate::onboarding::{ApplicationKind, DraftId, OnboardingStep, StepPayload};

/// Endpoints used by the onboarding wizard.
///
/// `Err` means the request never produced a readable envelope (transport
/// failure, unreadable file). A server-side rejection is `Ok` with
/// `ok: false`.
#[async_trait]
pub trait OnboardingApi: Send + Sync {
    /// Upload one binary attachment.
    async fn upload(&self, file: &LocalFile) -> Result<ApiResponse<UploadedFile>, ApiError>;

    /// Save the fields of one step. `draft_id` is `None` only before the
    /// first successful save of the application.
    async fn save_step(
        &self,
        kind: ApplicationKind,
        step: OnboardingStep,
        draft_id: Option<&DraftId>,
        payload: &StepPayload,
    ) -> Result<ApiResponse<DraftRef>, ApiError>;

    /// Finalize the application.
    async fn submit(
        &self,
        kind: ApplicationKind,
        draft_id: &DraftId,
    ) -> Result<ApiResponse<Value>, ApiError>;
}

/// Catalog, cart and wishlist endpoints.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    async fn fetch_categories(&self) -> Result<Vec<Value>, ApiError>;

    async fn fetch_subcategories(&self) -> Result<Vec<Value>, ApiError>;

    async fn fetch_groups(&self) -> Result<Vec<Value>, ApiError>;

    async fn fetch_products(&self, group_id: &str) -> Result<Vec<Value>, ApiError>;

    async fn fetch_cart(&self) -> Result<Vec<CartLine>, ApiError>;

    async fn add_to_cart(&self, product_id: &str, quantity: u32)
    -> Result<ApiResponse<Value>, ApiError>;

    async fn update_cart_item(
        &self,
        product_id: &str,
        quantity: u32,
    ) -> Result<ApiResponse<Value>, ApiError>;

    async fn remove_from_cart(&self, product_id: &str) -> Result<ApiResponse<Value>, ApiError>;

    /// Product ids on the wishlist.
    async fn fetch_wishlist(&self) -> Result<Vec<String>, ApiError>;

    async fn add_to_wishlist(&self, product_id: &str) -> Result<ApiResponse<Value>, ApiError>;

    async fn remove_from_wishlist(&self, product_id: &str)
    -> Result<ApiResponse<Value>, ApiError>;
}
