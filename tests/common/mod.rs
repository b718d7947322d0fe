//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Session fixtures wired to in-process collaborators
//! - Custom assertion macros

pub mod assertions;

// Re-export commonly used utilities
pub use fixtures::*;
