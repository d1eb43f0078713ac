//! Repository implementations for database operations.

pub mod api_key_credential;
pub mod content;
pub mod product_translation;
pub mod quota;
pub mod translation_job;
pub mod translation_log;

pub use api_key_credential::ApiKeyCredentialRepository;
pub use content::ContentRepository;
pub use product_translation::ProductTranslationRepository;
pub use quota::QuotaRepository;
pub use translation_job::TranslationJobRepository;
pub use translation_log::TranslationLogRepository;
