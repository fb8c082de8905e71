//! Builder for optimistic multi-key transactions.

use std::time::Duration;

use crate::entry::{Check, CommitResult, KvEntry, Mutation, Versionstamp};
use crate::error::KvResult;
use crate::key::Key;
use crate::traits::KvStore;

/// A batch of checks and mutations committed as one unit.
///
/// Nothing touches the store until [`commit`](Self::commit). Dropping the
/// builder without committing leaves no trace.
#[must_use = "an atomic operation does nothing until committed"]
pub struct AtomicOperation<'a, S: KvStore + ?Sized> {
    store: &'a S,
    checks: Vec<Check>,
    mutations: Vec<Mutation>,
}

impl<'a, S: KvStore + ?Sized> AtomicOperation<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            checks: Vec::new(),
            mutations: Vec::new(),
        }
    }

    /// Require `entry.key` to still carry the versionstamp observed in `entry`.
    pub fn check(mut self, entry: &KvEntry) -> Self {
        self.checks.push(Check::from(entry));
        self
    }

    pub fn check_key(mut self, key: Key, versionstamp: Option<Versionstamp>) -> Self {
        self.checks.push(Check { key, versionstamp });
        self
    }

    pub fn set(mut self, key: Key, value: impl Into<Vec<u8>>) -> Self {
        self.mutations.push(Mutation::Set {
            key,
            value: value.into(),
            expire_in: None,
        });
        self
    }

    /// Set a key that the store deletes once `ttl` has elapsed.
    pub fn set_with_ttl(mut self, key: Key, value: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        self.mutations.push(Mutation::Set {
            key,
            value: value.into(),
            expire_in: Some(ttl),
        });
        self
    }

    pub fn delete(mut self, key: Key) -> Self {
        self.mutations.push(Mutation::Delete { key });
        self
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn commit(self) -> KvResult<CommitResult> {
        self.store.commit(&self.checks, &self.mutations)
    }
}

impl<S: KvStore + ?Sized> std::fmt::Debug for AtomicOperation<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicOperation")
            .field("checks", &self.checks.len())
            .field("mutations", &self.mutations.len())
            .finish()
    }
}
