//! Background job scheduler and job implementations.

mod scheduler;
mod stale_claim_recovery;
mod translation_batch;

pub use scheduler::{Job, JobFrequency, JobScheduler};
pub use stale_claim_recovery::StaleClaimRecoveryJob;
pub use translation_batch::TranslationBatchJob;
