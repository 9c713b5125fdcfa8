//! bbscart: storefront client core: onboarding wizard, session, catalog,
//! cart and wishlist over the bbscart REST API.

pub mod api;
pub mod attachments;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod normalize;
pub mod onboarding;
pub mod session;
pub mod store;
