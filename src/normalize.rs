//! Field-name normalization for backend JSON.
//!
//! The backend is inconsistent about what it calls the same concept (a
//! category id may arrive as `categoryId`, `category_id`, a populated
//! `category` object, or `catId`). Every reader goes through these helpers
//! with an explicit priority-ordered key list and gets one canonical value.

use serde_json::Value;

pub const ID_KEYS: &[&str] = &["_id", "id"];
pub const NAME_KEYS: &[&str] = &["name", "title", "label"];
pub const CATEGORY_ID_KEYS: &[&str] = &["categoryId", "category_id", "category", "catId"];
pub const SUBCATEGORY_ID_KEYS: &[&str] = &[
    "subcategoryId",
    "subCategoryId",
    "subcategory_id",
    "subcategory",
    "subCategory",
];
pub const GROUP_ID_KEYS: &[&str] = &["groupId", "group_id", "group", "productGroup"];
pub const PRODUCT_ID_KEYS: &[&str] = &["productId", "product_id", "product", "_id", "id"];
pub const PRICE_KEYS: &[&str] = &["price", "sellingPrice", "salePrice", "mrp"];
pub const QUANTITY_KEYS: &[&str] = &["quantity", "qty", "count"];
pub const FILE_URL_KEYS: &[&str] = &["url", "fileUrl", "location", "path"];
pub const LIST_KEYS: &[&str] = &["data", "items", "results", "products"];

/// First non-empty string found under `keys`, in order.
///
/// Strings are trimmed, numbers are stringified, and an object value yields
/// its own id (so a populated reference reads the same as a bare id).
pub fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(scalar_or_ref_id)
}

fn scalar_or_ref_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(_) => ID_KEYS
            .iter()
            .filter_map(|key| value.get(*key))
            .find_map(scalar_or_ref_id),
        _ => None,
    }
}

/// First numeric value under `keys`. Numeric strings are accepted.
pub fn first_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|key| value.get(*key)).find_map(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// First non-negative integer under `keys`.
pub fn first_u32(value: &Value, keys: &[&str]) -> Option<u32> {
    first_f64(value, keys)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

/// Unwrap a list response: a bare array, or the first array under
/// [`LIST_KEYS`] (searched one level deep, so `{ data: { items: [] } }`
/// also works). Anything else is empty.
pub fn list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(_) => LIST_KEYS
            .iter()
            .filter_map(|key| value.get(*key))
            .find_map(|inner| match inner {
                Value::Array(items) => Some(items.clone()),
                Value::Object(_) => LIST_KEYS
                    .iter()
                    .filter_map(|key| inner.get(*key))
                    .find_map(|v| v.as_array().cloned()),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_order_wins() {
        let v = json!({"catId": "c3", "category_id": "c2"});
        assert_eq!(first_string(&v, CATEGORY_ID_KEYS).as_deref(), Some("c2"));
    }

    #[test]
    fn populated_reference_yields_its_id() {
        let v = json!({"category": {"_id": "c9", "name": "Fruits"}});
        assert_eq!(first_string(&v, CATEGORY_ID_KEYS).as_deref(), Some("c9"));
    }

    #[test]
    fn empty_values_fall_through() {
        let v = json!({"categoryId": "", "category_id": null, "category": "c1"});
        assert_eq!(first_string(&v, CATEGORY_ID_KEYS).as_deref(), Some("c1"));
        assert_eq!(first_string(&json!({}), CATEGORY_ID_KEYS), None);
    }

    #[test]
    fn numbers_are_stringified() {
        assert_eq!(first_string(&json!({"id": 42}), ID_KEYS).as_deref(), Some("42"));
    }

    #[test]
    fn numeric_fields() {
        let v = json!({"sellingPrice": "199.50", "qty": 3});
        assert_eq!(first_f64(&v, PRICE_KEYS), Some(199.5));
        assert_eq!(first_u32(&v, QUANTITY_KEYS), Some(3));
        assert_eq!(first_u32(&json!({"qty": -1}), QUANTITY_KEYS), None);
    }

    #[test]
    fn list_shapes() {
        assert_eq!(list(&json!([1, 2])).len(), 2);
        assert_eq!(list(&json!({"ok": true, "data": [1]})).len(), 1);
        assert_eq!(list(&json!({"data": {"items": [1, 2, 3]}})).len(), 3);
        assert!(list(&json!({"ok": false})).is_empty());
        assert!(list(&json!("nope")).is_empty());
    }
}
