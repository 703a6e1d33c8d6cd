use crate::types::StreamVersion;

/// Decides when the state of a stream is worth a snapshot.
///
/// With an interval of `N`, a snapshot is taken whenever an append crosses a multiple of `N`, so
/// loading never folds more than `N` events on top of the latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    interval: Option<StreamVersion>,
}

impl SnapshotPolicy {
    pub const DEFAULT_INTERVAL: StreamVersion = 100;

    /// Snapshots every `interval` events. A non positive interval disables snapshotting.
    pub const fn every(interval: StreamVersion) -> Self {
        if interval > 0 {
            Self {
                interval: Some(interval),
            }
        } else {
            Self::never()
        }
    }

    pub const fn never() -> Self {
        Self { interval: None }
    }

    pub const fn interval(&self) -> Option<StreamVersion> {
        self.interval
    }

    /// Returns true if going from `old_version` to `new_version` crossed an interval boundary.
    pub fn should_snapshot(&self, old_version: StreamVersion, new_version: StreamVersion) -> bool {
        match self.interval {
            Some(interval) => new_version.div_euclid(interval) > old_version.div_euclid(interval),
            None => false,
        }
    }
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self::every(Self::DEFAULT_INTERVAL)
    }
}
