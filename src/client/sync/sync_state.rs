//! # Sync State
//!
//! Read-only snapshots of the two pieces of state the sync core owns: whether
//! the view is mid-edit, and whether the backend looks reachable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Edit gate state for one view session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditState {
    pub is_editing: bool,
    pub pending_refresh: bool,
}

/// Named states of the edit gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditPhase {
    Idle,
    Editing,
    EditingWithPendingRefresh,
}

impl EditState {
    pub fn phase(&self) -> EditPhase {
        match (self.is_editing, self.pending_refresh) {
            (true, true) => EditPhase::EditingWithPendingRefresh,
            (true, false) => EditPhase::Editing,
            (false, _) => EditPhase::Idle,
        }
    }
}

/// Best-effort view of backend reachability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub checking: bool,
    pub last_error: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
}

/// Named states of the connectivity monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionPhase {
    Checking,
    Connected,
    Disconnected,
}

impl Default for ConnectionState {
    /// Views start out assuming the backend is reachable
    fn default() -> Self {
        Self {
            connected: true,
            checking: false,
            last_error: None,
            last_checked: None,
        }
    }
}

impl ConnectionState {
    pub fn phase(&self) -> ConnectionPhase {
        if self.checking {
            ConnectionPhase::Checking
        } else if self.connected {
            ConnectionPhase::Connected
        } else {
            ConnectionPhase::Disconnected
        }
    }
}
