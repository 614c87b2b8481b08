//! Shared test utilities for clipvault integration tests.
//!
//! - `TestHarness` for isolated ingestion runs in temp directories
//! - `ConfigBuilder` for programmatic configurations
//! - Derivative generators that can be observed or held back

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
