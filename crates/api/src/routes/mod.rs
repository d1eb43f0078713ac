//! HTTP route handlers.

pub mod api_keys;
pub mod health;
pub mod product_translations;
pub mod translations;
