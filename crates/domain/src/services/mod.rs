//! Translation pipeline services.
//!
//! Services hold the pipeline's business logic and reach storage and the
//! translation API only through the traits in [`job_store`] and
//! [`translation_provider`].

pub mod batch;
pub mod diagnostics;
pub mod error;
pub mod job_store;
pub mod key_pool;
pub mod memory_store;
pub mod pipeline;
pub mod priority;
pub mod quota;
pub mod scheduler;
pub mod settings;
pub mod translation_provider;
pub mod worker;

pub use error::{PipelineError, PipelineResult};
pub use job_store::{
    ClaimOutcome, ContentItem, ContentSource, CredentialSource, PriorityProgress, QuotaStore,
    TranslationJobStore,
};
pub use key_pool::{KeyPool, KeyPoolError, PoolKey, PooledTranslation, PooledTranslationProvider};
pub use memory_store::InMemoryTranslationStore;
pub use pipeline::TranslationPipeline;
pub use settings::PipelineSettings;
pub use translation_provider::{
    KeyedTranslationClient, MockTranslationProvider, ProviderUsage, TranslationError,
    TranslationProvider,
};
