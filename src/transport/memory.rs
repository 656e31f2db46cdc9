//! Per-destination memory of rejected key-exchange groups.
//!
//! When a server rejects a group, it is recorded here under the server's
//! host name so every later attempt to that host prunes it before the first
//! round trip. Records only grow; nothing is ever forgotten for the lifetime
//! of the memory.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::fingerprint::tls::ClientHelloSpec;

/// Destination identity: host name, ASCII-lowercased, trailing dot removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationKey(String);

impl DestinationKey {
    pub fn new(host: &str) -> Self {
        Self(host.trim_end_matches('.').to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DestinationKey {
    fn from(host: &str) -> Self {
        Self::new(host)
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Groups one destination is known to reject.
#[derive(Debug, Default)]
pub struct RejectedGroups {
    groups: RwLock<BTreeSet<u16>>,
}

impl RejectedGroups {
    /// Add a group. Returns whether the set grew.
    pub fn insert(&self, group: u16) -> bool {
        self.groups.write().insert(group)
    }

    pub fn contains(&self, group: u16) -> bool {
        self.groups.read().contains(&group)
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Point-in-time copy.
    pub fn snapshot(&self) -> BTreeSet<u16> {
        self.groups.read().clone()
    }
}

/// Concurrent destination -> rejected groups map.
///
/// Cheap to share behind an `Arc`; independent instances never see each
/// other's records.
#[derive(Debug, Default)]
pub struct FingerprintMemory {
    records: DashMap<DestinationKey, Arc<RejectedGroups>>,
}

impl FingerprintMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `destination` rejected `group`.
    ///
    /// The destination's record is created atomically on first use. Returns
    /// `false` when the group was already known, meaning further pruning
    /// cannot help.
    pub fn record_rejected_group(&self, destination: &str, group: u16) -> bool {
        let key = DestinationKey::new(destination);
        let record = Arc::clone(self.records.entry(key).or_default().value());
        let changed = record.insert(group);
        if changed {
            debug!(destination, group, "recorded rejected group");
        }
        changed
    }

    /// Record for a destination, if any rejection was ever seen.
    pub fn get(&self, destination: &str) -> Option<Arc<RejectedGroups>> {
        self.records
            .get(&DestinationKey::new(destination))
            .map(|r| Arc::clone(r.value()))
    }

    /// Snapshot of the destination's rejected groups (empty when unknown).
    pub fn rejected_groups(&self, destination: &str) -> BTreeSet<u16> {
        self.get(destination)
            .map(|r| r.snapshot())
            .unwrap_or_default()
    }

    pub fn contains(&self, destination: &str, group: u16) -> bool {
        self.get(destination).is_some_and(|r| r.contains(group))
    }

    /// Prune every key share and supported group the destination rejects.
    /// Returns whether the spec changed.
    pub fn prune(&self, destination: &str, spec: &mut ClientHelloSpec) -> bool {
        let rejected = self.rejected_groups(destination);
        let changed = spec.prune_groups(&rejected);
        if changed {
            debug!(destination, ?rejected, "pruned rejected groups from ClientHello");
        }
        changed
    }

    /// Destinations with at least one record.
    pub fn destinations(&self) -> Vec<DestinationKey> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of destination records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
