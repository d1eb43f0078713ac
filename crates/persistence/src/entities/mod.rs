//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod api_key_credential;
pub mod content;
pub mod monthly_quota;
pub mod product_translation;
pub mod translation_job;
pub mod translation_log;

pub use api_key_credential::ApiKeyCredentialEntity;
pub use content::{FaqItemEntity, ProductEntity};
pub use monthly_quota::MonthlyQuotaEntity;
pub use product_translation::ProductTranslationEntity;
pub use translation_job::{
    ClaimCandidateEntity, LanguageStatusCountEntity, PriorityProgressEntity, TranslationJobEntity,
};
pub use translation_log::TranslationLogEntity;
