/**
 * Sync Event Types
 *
 * This module defines the tagged "data changed" events carried by the update
 * event router. Each event has a closed kind and two origin flags that let
 * consumers tell self-originated changes from sync-originated ones, which is
 * what keeps a local write from echoing back as another refresh.
 */
use crate::shared::change::ResourceFamily;
use serde::{Deserialize, Serialize};

/// Kind of sync event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventKind {
    /// The user started editing a cell
    EditStart,
    /// The user released the cell
    EditEnd,
    /// Shared state changed somewhere
    DataChanged,
}

/// Flags describing where an event came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginFlags {
    /// Update bookkeeping only, never trigger a visible refresh
    pub no_refresh: bool,
    /// Originated from a remote notification or a cross-tab signal
    pub from_sync: bool,
}

/// What a consumer is allowed to do with a `DataChanged` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDisposition {
    /// Both flags set: the loop was already accounted for, do nothing
    Suppress,
    /// Only `no_refresh` set: bookkeeping only
    BookkeepingOnly,
    /// Schedule a refresh
    Refresh,
}

impl OriginFlags {
    /// Flags for a direct local user action
    pub const LOCAL: OriginFlags = OriginFlags {
        no_refresh: false,
        from_sync: false,
    };

    /// Flags for a change relayed from the feed or another tab
    pub const SYNC: OriginFlags = OriginFlags {
        no_refresh: false,
        from_sync: true,
    };

    /// Map the flags onto a refresh decision.
    ///
    /// Only the two-flag combination suppresses outright; `from_sync` alone
    /// still refreshes, it only forbids re-broadcasting.
    pub fn disposition(&self) -> RefreshDisposition {
        match (self.no_refresh, self.from_sync) {
            (true, true) => RefreshDisposition::Suppress,
            (true, false) => RefreshDisposition::BookkeepingOnly,
            (false, _) => RefreshDisposition::Refresh,
        }
    }
}

/// Producer that emitted an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "family")]
pub enum EventSource {
    /// Direct user action in this view
    Local,
    /// Remote change feed
    Realtime(ResourceFamily),
    /// Genuine storage-mutation signal from another tab
    CrossTab,
    /// Same-tab synthetic signal after a local write
    LocalWrite,
}

/// A tagged sync event, dispatched synchronously through the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Event kind
    pub kind: SyncEventKind,
    /// Origin flags
    pub origin: OriginFlags,
    /// Producer
    pub source: EventSource,
}

impl SyncEvent {
    /// Create a new event
    pub fn new(kind: SyncEventKind, origin: OriginFlags, source: EventSource) -> Self {
        Self {
            kind,
            origin,
            source,
        }
    }

    /// Local edit-start event
    pub fn edit_start() -> Self {
        Self::new(SyncEventKind::EditStart, OriginFlags::LOCAL, EventSource::Local)
    }

    /// Local edit-end event
    pub fn edit_end() -> Self {
        Self::new(SyncEventKind::EditEnd, OriginFlags::LOCAL, EventSource::Local)
    }

    /// Data-changed event with explicit flags
    pub fn data_changed(origin: OriginFlags, source: EventSource) -> Self {
        Self::new(SyncEventKind::DataChanged, origin, source)
    }

    /// Data-changed event relayed from a sync producer
    pub fn synced_change(source: EventSource) -> Self {
        Self::data_changed(OriginFlags::SYNC, source)
    }

    /// Whether this event should never be relayed onward
    pub fn is_from_sync(&self) -> bool {
        self.origin.from_sync
    }
}
