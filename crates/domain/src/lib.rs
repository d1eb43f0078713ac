//! Domain layer for the dealer translation backend.
//!
//! This crate contains:
//! - Domain models (translation jobs, monthly quota, API key credentials, logs)
//! - The translation pipeline: scheduler, batch processor, quota tracker,
//!   priority drain supervisor, diagnostics and the API key pool
//! - Storage and provider traits implemented by the persistence and api crates

pub mod models;
pub mod services;
