//! Shared utilities and common types for the location relay.
//!
//! This crate provides common functionality used across all other crates:
//! - Client key hashing
//! - Common validation logic
//! - Serde helpers for string-valued wire bodies

pub mod crypto;
pub mod validation;
pub mod wire;
