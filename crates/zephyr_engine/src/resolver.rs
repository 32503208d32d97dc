//! Conflict resolution between the two stores.

use std::fmt;

/// Which store a value or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSide {
    /// The local store.
    Local,
    /// The cloud-replicated remote store.
    Remote,
}

impl StoreSide {
    /// The direction a sync moves data when this side is authoritative.
    #[must_use]
    pub fn direction(self) -> SyncDirection {
        match self {
            StoreSide::Local => SyncDirection::ToRemote,
            StoreSide::Remote => SyncDirection::FromRemote,
        }
    }

    /// The other side.
    #[must_use]
    pub fn opposite(self) -> StoreSide {
        match self {
            StoreSide::Local => StoreSide::Remote,
            StoreSide::Remote => StoreSide::Local,
        }
    }
}

impl fmt::Display for StoreSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSide::Local => write!(f, "local"),
            StoreSide::Remote => write!(f, "remote"),
        }
    }
}

/// The direction data moves during one sync operation.
///
/// One direction is resolved per operation; it never varies per key within
/// a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Local is authoritative; data is copied into the remote store.
    ToRemote,
    /// Remote is authoritative; data is copied into the local store.
    FromRemote,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::ToRemote => write!(f, "TO remote"),
            SyncDirection::FromRemote => write!(f, "FROM remote"),
        }
    }
}

/// Decides which store holds the authoritative data, given the sync clock
/// values read from each store.
///
/// Rules:
/// - Both clocks present: the strictly greater timestamp wins; ties resolve
///   to [`StoreSide::Local`], avoiding a needless network write
/// - Only the remote clock present: [`StoreSide::Remote`]
/// - Only the local clock present, or neither (bootstrap - nothing has ever
///   synced): [`StoreSide::Local`], so the first sync seeds the remote store
///
/// Pure and deterministic given the two timestamps.
#[must_use]
pub fn latest_store(local: Option<i64>, remote: Option<i64>) -> StoreSide {
    match (local, remote) {
        (Some(local), Some(remote)) => {
            if remote > local {
                StoreSide::Remote
            } else {
                StoreSide::Local
            }
        }
        (None, Some(_)) => StoreSide::Remote,
        (Some(_), None) | (None, None) => StoreSide::Local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_local_wins() {
        assert_eq!(latest_store(Some(100), Some(50)), StoreSide::Local);
    }

    #[test]
    fn newer_remote_wins() {
        assert_eq!(latest_store(Some(50), Some(100)), StoreSide::Remote);
    }

    #[test]
    fn tie_resolves_to_local() {
        assert_eq!(latest_store(Some(100), Some(100)), StoreSide::Local);
    }

    #[test]
    fn only_remote_clock_means_remote() {
        assert_eq!(latest_store(None, Some(1)), StoreSide::Remote);
    }

    #[test]
    fn only_local_clock_means_local() {
        assert_eq!(latest_store(Some(1), None), StoreSide::Local);
    }

    #[test]
    fn bootstrap_means_local() {
        assert_eq!(latest_store(None, None), StoreSide::Local);
    }

    #[test]
    fn opposite_flips() {
        assert_eq!(StoreSide::Local.opposite(), StoreSide::Remote);
        assert_eq!(StoreSide::Remote.opposite(), StoreSide::Local);
    }

    #[test]
    fn side_to_direction() {
        assert_eq!(StoreSide::Local.direction(), SyncDirection::ToRemote);
        assert_eq!(StoreSide::Remote.direction(), SyncDirection::FromRemote);
    }

    #[test]
    fn direction_display() {
        assert_eq!(SyncDirection::ToRemote.to_string(), "TO remote");
        assert_eq!(SyncDirection::FromRemote.to_string(), "FROM remote");
    }
}
