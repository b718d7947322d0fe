//! Remote change-feed types
//!
//! Row-level change notifications pushed by the remote backend for the
//! resource families the planner watches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A family of remote rows with its own change channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFamily {
    /// Planned shifts and absences
    ScheduleEntries,
    /// Employee master records
    EmployeeRecords,
}

impl ResourceFamily {
    /// Every family the planner knows about
    pub const ALL: [ResourceFamily; 2] = [
        ResourceFamily::ScheduleEntries,
        ResourceFamily::EmployeeRecords,
    ];

    /// Backend table backing this family
    pub fn table(&self) -> &'static str {
        match self {
            ResourceFamily::ScheduleEntries => "schedule_entries",
            ResourceFamily::EmployeeRecords => "employees",
        }
    }

    /// Name of the logical realtime channel for this family
    pub fn channel_name(&self) -> String {
        format!("{}-changes", self.table())
    }
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Kind of row mutation reported by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
    /// Wildcard, used when the backend does not say which mutation happened
    #[serde(rename = "*")]
    Any,
}

/// A single change notification from the remote feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Mutation kind
    pub event: ChangeKind,
    /// Table the mutated row belongs to
    pub table: String,
    /// Opaque row payload, never inspected by the sync core
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ChangeNotification {
    /// Create a notification for a family's table
    pub fn new(event: ChangeKind, family: ResourceFamily, payload: serde_json::Value) -> Self {
        Self {
            event,
            table: family.table().to_string(),
            payload,
        }
    }

    /// Family this notification belongs to, if the table is a watched one
    pub fn family(&self) -> Option<ResourceFamily> {
        ResourceFamily::ALL
            .into_iter()
            .find(|family| family.table() == self.table)
    }
}
