use crate::atomic::AtomicOperation;
use crate::entry::{Check, CommitResult, KvEntry, Mutation};
use crate::error::KvResult;
use crate::key::Key;
use crate::list::{KvList, ListOptions};

/// Ordered, transactional key-value store.
///
/// All implementations must satisfy these invariants:
/// - Every read returns the entry's current versionstamp, or `None` if the
///   key is absent or expired.
/// - A batch commits atomically iff every check still holds at commit time;
///   otherwise nothing is applied and [`CommitResult::Conflict`] is returned.
/// - Two batches that checked the same prior version of a key can never
///   both commit. Batches with disjoint keys never conflict.
/// - Keys written with a TTL become unreadable once it elapses and are
///   removed by the store, not by readers.
pub trait KvStore: Send + Sync {
    /// Point lookup.
    fn get(&self, key: &Key) -> KvResult<KvEntry>;

    /// Batched point lookup, one entry per key, in order.
    ///
    /// Default implementation calls `get()` for each key. Backends should
    /// override it to read every key from one snapshot.
    fn get_many(&self, keys: &[Key]) -> KvResult<Vec<KvEntry>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// One page of a prefix scan.
    ///
    /// Returns up to `limit` live entries whose key strictly extends `prefix`,
    /// in ascending key order (descending if `reverse`), starting after
    /// `cursor` when one is given.
    fn scan(
        &self,
        prefix: &Key,
        cursor: Option<&Key>,
        reverse: bool,
        limit: usize,
    ) -> KvResult<Vec<KvEntry>>;

    /// Apply `mutations` atomically iff every check in `checks` holds.
    fn commit(&self, checks: &[Check], mutations: &[Mutation]) -> KvResult<CommitResult>;

    /// Physically remove every expired key. Returns how many were removed.
    fn purge_expired(&self) -> KvResult<usize>;

    /// Start building an atomic batch against this store.
    fn atomic(&self) -> AtomicOperation<'_, Self>
    where
        Self: Sized,
    {
        AtomicOperation::new(self)
    }

    /// Lazily iterate the entries under `prefix`.
    fn list(&self, prefix: Key, options: ListOptions) -> KvList<'_, Self>
    where
        Self: Sized,
    {
        KvList::new(self, prefix, options)
    }
}
