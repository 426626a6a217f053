//! # Syncsched Testing Utils
//!
//! Shared testing utilities for the container sync scheduler.
//! This crate provides an in-memory mock of the dispatch store with
//! transactional (stage-then-commit) semantics, plus builders for
//! creating test data, usable across all other crates in the workspace.
//!
//! ## Usage
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! syncsched-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

// Re-export commonly used items
pub use builders::*;
pub use mocks::*;
