//! Persistence layer: flat string key/value storage on the device.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;

/// Well-known storage keys.
pub mod keys {
    /// Draft id of an in-progress franchisee application.
    pub const FRANCHISEE_ID: &str = "franchiseeId";
    /// Draft id of an in-progress vendor application.
    pub const VENDOR_ID: &str = "vendorId";
    /// JSON blob `{ token, user }` for the signed-in account.
    pub const AUTH: &str = "auth";
    pub const DELIVERY_PINCODE: &str = "deliveryPincode";
}
