//! Shared utilities and common types for the dealer translation backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Hashing and masking of API key material
//! - Common validation logic (language codes, content fields)

pub mod crypto;
pub mod validation;
