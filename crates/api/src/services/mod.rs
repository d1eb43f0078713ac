//! Application services that sit between the HTTP routes and the domain
//! pipeline.

pub mod deepl;
pub mod product_translation;

pub use deepl::DeeplClient;
pub use product_translation::ProductTranslationService;
