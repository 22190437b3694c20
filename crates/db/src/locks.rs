//! Per-trip locks.
//!
//! Payment creation reads a trip's balance, validates and inserts. Two
//! payments racing on the same trip would both see the old balance, so the
//! whole sequence runs under a lock keyed by organisation and request id.
//! Multi-trip payments take their locks in sorted order.
//!
//! An entry lives only while someone holds or waits on it, so the registry
//! stays bounded by the trips in flight rather than every request id ever
//! named.
//!
//! The registry is per process. Servers sharing one database do not see
//! each other's locks; there a payment is kept only if it can bump the
//! version of each trip it pays from the version it validated against, and
//! is withdrawn otherwise. Within one process the locks keep payments from
//! contending for that bump.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use haulage_shared::types::OrganizationId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockKey = (OrganizationId, String);

/// Registry of trip locks.
#[derive(Debug, Clone, Default)]
pub struct TripLocks {
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

/// Held locks; released on drop.
#[derive(Debug)]
pub struct TripGuard {
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
    keys: Vec<LockKey>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for TripGuard {
    fn drop(&mut self) {
        self.guards.clear();
        // Map entry plus nobody else: no holder and no waiter.
        for key in self.keys.drain(..) {
            self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

impl TripLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every listed trip. Duplicates are locked once.
    pub async fn acquire<'a, I>(&self, organization_id: OrganizationId, request_ids: I) -> TripGuard
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ordered: BTreeSet<&str> = request_ids.into_iter().collect();
        // Built up front so a cancelled acquire still cleans up.
        let mut held = TripGuard {
            locks: self.locks.clone(),
            keys: Vec::with_capacity(ordered.len()),
            guards: Vec::with_capacity(ordered.len()),
        };
        for request_id in ordered {
            let key = (organization_id, request_id.to_string());
            let lock = self.locks.entry(key.clone()).or_default().clone();
            held.keys.push(key);
            held.guards.push(lock.lock_owned().await);
        }
        held
    }

    /// Number of trips currently locked or waited on.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no trip is locked or waited on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
