//! Category → subcategory → group drill-down menu.
//!
//! The three lists are fetched once and filtered client-side by parent id.
//! Parent ids go through [`crate::normalize`], so it does not matter which
//! of the backend's spellings a record uses.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::api::StorefrontApi;
use crate::error::ApiError;
use crate::normalize;

/// One entry of the drill-down menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogNode {
    pub id: String,
    pub name: String,
    /// Id of the category (for subcategories) or subcategory (for groups).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl CatalogNode {
    /// Read a node. Records without an id are dropped.
    pub fn from_json(value: &Value, parent_keys: &[&str]) -> Option<Self> {
        let id = normalize::first_string(value, normalize::ID_KEYS)?;
        let name = normalize::first_string(value, normalize::NAME_KEYS).unwrap_or_default();
        let parent_id = if parent_keys.is_empty() {
            None
        } else {
            normalize::first_string(value, parent_keys)
        };
        Some(Self {
            id,
            name,
            parent_id,
        })
    }
}

/// A product as listed under a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub price: Option<f64>,
    pub group_id: Option<String>,
}

impl ProductSummary {
    pub fn from_json(value: &Value) -> Option<Self> {
        Some(Self {
            id: normalize::first_string(value, normalize::ID_KEYS)?,
            name: normalize::first_string(value, normalize::NAME_KEYS).unwrap_or_default(),
            price: normalize::first_f64(value, normalize::PRICE_KEYS),
            group_id: normalize::first_string(value, normalize::GROUP_ID_KEYS),
        })
    }
}

fn nodes(values: &[Value], parent_keys: &[&str]) -> Vec<CatalogNode> {
    values
        .iter()
        .filter_map(|v| CatalogNode::from_json(v, parent_keys))
        .collect()
}

/// The loaded drill-down menu.
pub struct CatalogMenu {
    api: Arc<dyn StorefrontApi>,
    categories: Vec<CatalogNode>,
    subcategories: Vec<CatalogNode>,
    groups: Vec<CatalogNode>,
}

impl CatalogMenu {
    /// Fetch categories, subcategories and groups, one after another.
    pub async fn load(api: Arc<dyn StorefrontApi>) -> Result<Self, ApiError> {
        let categories = nodes(&api.fetch_categories().await?, &[]);
        let subcategories = nodes(&api.fetch_subcategories().await?, normalize::CATEGORY_ID_KEYS);
        let groups = nodes(&api.fetch_groups().await?, normalize::SUBCATEGORY_ID_KEYS);

        tracing::debug!(
            categories = categories.len(),
            subcategories = subcategories.len(),
            groups = groups.len(),
            "Catalog menu loaded"
        );

        Ok(Self {
            api,
            categories,
            subcategories,
            groups,
        })
    }

    pub fn categories(&self) -> &[CatalogNode] {
        &self.categories
    }

    pub fn subcategories_of(&self, category_id: &str) -> Vec<&CatalogNode> {
        self.subcategories
            .iter()
            .filter(|s| s.parent_id.as_deref() == Some(category_id))
            .collect()
    }

    pub fn groups_of(&self, subcategory_id: &str) -> Vec<&CatalogNode> {
        self.groups
            .iter()
            .filter(|g| g.parent_id.as_deref() == Some(subcategory_id))
            .collect()
    }

    /// Products of a group. Entries tagged with another group are dropped,
    /// in case the backend ignores the filter.
    pub async fn products_in_group(&self, group_id: &str) -> Result<Vec<ProductSummary>, ApiError> {
        let products = self.api.fetch_products(group_id).await?;
        Ok(products
            .iter()
            .filter_map(ProductSummary::from_json)
            .filter(|p| p.group_id.as_deref().is_none_or(|g| g == group_id))
            .collect())
    }
}
