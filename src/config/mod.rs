//! Configuration module for auto-scan sessions
//!
//! This module provides the `ScanConfig` struct and its type-safe builder
//! for configuring scan sessions with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{ScanConfigBuilder, WithSiteUrl};
pub use types::{ScanConfig, default_review_keywords};
