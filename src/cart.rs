//! Cart and wishlist mirrors of server state.
//!
//! Mutations are applied locally first so the UI updates immediately, then
//! sent to the backend. If the backend refuses or the request fails, the
//! local copy is restored to what it was before the mutation.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::api::{ApiResponse, StorefrontApi};
use crate::error::{ApiError, CartError, FALLBACK_MESSAGE};
use crate::normalize;

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    /// Unit price in rupees.
    pub price: f64,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: &str, name: &str, price: f64, quantity: u32) -> Self {
        Self {
            product_id: product_id.to_string(),
            name: name.to_string(),
            price,
            quantity,
        }
    }

    /// Read a cart line from backend JSON.
    ///
    /// Accepts both flat lines and lines with a populated `product`
    /// object; product fields fill in whatever the line itself lacks.
    pub fn from_json(item: &Value) -> Option<Self> {
        let product = item.get("product").filter(|p| p.is_object());
        let product_id = normalize::first_string(item, normalize::PRODUCT_ID_KEYS)?;
        let name = normalize::first_string(item, normalize::NAME_KEYS)
            .or_else(|| product.and_then(|p| normalize::first_string(p, normalize::NAME_KEYS)))
            .unwrap_or_default();
        let price = normalize::first_f64(item, normalize::PRICE_KEYS)
            .or_else(|| product.and_then(|p| normalize::first_f64(p, normalize::PRICE_KEYS)))
            .unwrap_or(0.0);
        let quantity = normalize::first_u32(item, normalize::QUANTITY_KEYS).unwrap_or(1);

        Some(Self {
            product_id,
            name,
            price,
            quantity,
        })
    }

    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Turn an envelope into `Ok(())` or a rollback-worthy error.
fn accepted(action: &str, result: Result<ApiResponse<Value>, ApiError>) -> Result<(), CartError> {
    match result {
        Ok(resp) if resp.ok => Ok(()),
        Ok(resp) => Err(CartError::Rejected {
            action: action.to_string(),
            message: resp.message_or(FALLBACK_MESSAGE),
        }),
        Err(e) => Err(CartError::Api(e)),
    }
}

/// Local mirror of the signed-in user's cart.
pub struct CartState {
    api: Arc<dyn StorefrontApi>,
    lines: RwLock<Vec<CartLine>>,
    /// Serializes mutations so a rollback never clobbers a later change.
    mutation: Mutex<()>,
}

impl CartState {
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        Self {
            api,
            lines: RwLock::new(Vec::new()),
            mutation: Mutex::new(()),
        }
    }

    /// Replace the local copy with the server's.
    pub async fn refresh(&self) -> Result<(), CartError> {
        let _guard = self.mutation.lock().await;
        let lines = self.api.fetch_cart().await?;
        tracing::debug!(lines = lines.len(), "Cart refreshed");
        *self.lines.write().await = lines;
        Ok(())
    }

    pub async fn lines(&self) -> Vec<CartLine> {
        self.lines.read().await.clone()
    }

    pub async fn quantity_of(&self, product_id: &str) -> u32 {
        self.lines
            .read()
            .await
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    /// Total number of items (sum of quantities), for the cart badge.
    pub async fn item_count(&self) -> u32 {
        self.lines.read().await.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line totals, rounded to paise.
    pub async fn subtotal(&self) -> f64 {
        let total: f64 = self.lines.read().await.iter().map(CartLine::line_total).sum();
        (total * 100.0).round() / 100.0
    }

    /// Add `line.quantity` of a product, merging with an existing line.
    pub async fn add(&self, line: CartLine) -> Result<(), CartError> {
        if line.quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }
        let _guard = self.mutation.lock().await;
        let snapshot = {
            let mut lines = self.lines.write().await;
            let snapshot = lines.clone();
            match lines.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or(CartError::InvalidQuantity(line.quantity))?;
                }
                None => lines.push(line.clone()),
            }
            snapshot
        };

        let result = accepted("add", self.api.add_to_cart(&line.product_id, line.quantity).await);
        self.settle("add", &line.product_id, snapshot, result).await
    }

    /// Set the quantity of a line. Zero removes it.
    pub async fn update_quantity(&self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(product_id).await;
        }
        let _guard = self.mutation.lock().await;
        let snapshot = {
            let mut lines = self.lines.write().await;
            let snapshot = lines.clone();
            let line = lines
                .iter_mut()
                .find(|l| l.product_id == product_id)
                .ok_or_else(|| CartError::NotInCart(product_id.to_string()))?;
            line.quantity = quantity;
            snapshot
        };

        let result = accepted("update", self.api.update_cart_item(product_id, quantity).await);
        self.settle("update", product_id, snapshot, result).await
    }

    pub async fn remove(&self, product_id: &str) -> Result<(), CartError> {
        let _guard = self.mutation.lock().await;
        let snapshot = {
            let mut lines = self.lines.write().await;
            let snapshot = lines.clone();
            let before = lines.len();
            lines.retain(|l| l.product_id != product_id);
            if lines.len() == before {
                return Err(CartError::NotInCart(product_id.to_string()));
            }
            snapshot
        };

        let result = accepted("remove", self.api.remove_from_cart(product_id).await);
        self.settle("remove", product_id, snapshot, result).await
    }

    /// Drop the local copy (logout). The server cart is untouched.
    ///
    /// Waits for a pending mutation so its rollback cannot restore old lines.
    pub async fn clear_local(&self) {
        let _guard = self.mutation.lock().await;
        self.lines.write().await.clear();
    }

    async fn settle(
        &self,
        action: &str,
        product_id: &str,
        snapshot: Vec<CartLine>,
        result: Result<(), CartError>,
    ) -> Result<(), CartError> {
        if let Err(e) = &result {
            tracing::warn!(action, product_id, "Cart change rolled back: {}", e);
            *self.lines.write().await = snapshot;
        }
        result
    }
}

/// Local mirror of the wishlist (product ids only).
pub struct WishlistState {
    api: Arc<dyn StorefrontApi>,
    items: RwLock<BTreeSet<String>>,
    mutation: Mutex<()>,
}

impl WishlistState {
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        Self {
            api,
            items: RwLock::new(BTreeSet::new()),
            mutation: Mutex::new(()),
        }
    }

    pub async fn refresh(&self) -> Result<(), CartError> {
        let _guard = self.mutation.lock().await;
        let ids = self.api.fetch_wishlist().await?;
        *self.items.write().await = ids.into_iter().collect();
        Ok(())
    }

    pub async fn contains(&self, product_id: &str) -> bool {
        self.items.read().await.contains(product_id)
    }

    pub async fn product_ids(&self) -> Vec<String> {
        self.items.read().await.iter().cloned().collect()
    }

    /// Add or remove a product. Returns whether it is now on the wishlist.
    pub async fn toggle(&self, product_id: &str) -> Result<bool, CartError> {
        let _guard = self.mutation.lock().await;
        let now_present = {
            let mut items = self.items.write().await;
            if items.remove(product_id) {
                false
            } else {
                items.insert(product_id.to_string());
                true
            }
        };

        let (action, result) = if now_present {
            ("wishlist add", self.api.add_to_wishlist(product_id).await)
        } else {
            ("wishlist remove", self.api.remove_from_wishlist(product_id).await)
        };

        match accepted(action, result) {
            Ok(()) => Ok(now_present),
            Err(e) => {
                tracing::warn!(action, product_id, "Wishlist change rolled back: {}", e);
                let mut items = self.items.write().await;
                if now_present {
                    items.remove(product_id);
                } else {
                    items.insert(product_id.to_string());
                }
                Err(e)
            }
        }
    }

    pub async fn clear_local(&self) {
        let _guard = self.mutation.lock().await;
        self.items.write().await.clear();
    }
}
