//! Shared Error Types
//!
//! This module defines the error types used by the sync core and its boundary
//! adapters. Most sync operations never fail outward; these errors only appear
//! at construction time, when a collaborator refuses a subscription, or when a
//! stored snapshot cannot be decoded.
//!
//! # Error Categories
//!
//! - `Serialization` - JSON encoding/decoding of the stored planning snapshot
//! - `Subscription` - the change feed refused a channel for a resource family
//! - `Storage` - the shared persistent store rejected an operation
//! - `MissingCollaborator` - a session was built without a required piece
//! - `Config` - invalid configuration
//!
//! # Usage
//!
//! ```rust
//! use planning_sync::shared::error::SyncError;
//! use planning_sync::shared::ResourceFamily;
//!
//! let error = SyncError::subscription(ResourceFamily::ScheduleEntries, "socket closed");
//! assert!(error.to_string().contains("schedule_entries"));
//! ```
use crate::shared::change::ResourceFamily;
use crate::shared::config::ConfigError;
use thiserror::Error;

/// Errors raised at the edges of the sync core
#[derive(Debug, Error, Clone)]
pub enum SyncError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// The change feed could not open a channel
    #[error("Subscription to {family} failed: {message}")]
    Subscription {
        /// Family the channel was requested for
        family: ResourceFamily,
        /// Human-readable error message
        message: String,
    },

    /// Shared persistent store error
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// A session was built without one of its collaborators
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new subscription error
    pub fn subscription(family: ResourceFamily, message: impl Into<String>) -> Self {
        Self::Subscription {
            family,
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
