use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::entry::{Check, CommitResult, KvEntry, Mutation, Versionstamp};
use crate::error::{KvError, KvResult};
use crate::key::Key;
use crate::traits::KvStore;
use crate::wal::{SyncMode, WalOp, WalRecord, WriteAheadLog};

/// Configuration for a journaled [`KvEngine`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KvConfig {
    /// When the write-ahead log is synced to disk.
    #[serde(default)]
    pub sync_mode: SyncMode,
}

#[derive(Clone, Debug)]
struct Slot {
    key: Key,
    value: Vec<u8>,
    versionstamp: Versionstamp,
    expires_at: Option<i64>,
}

impl Slot {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    fn to_entry(&self) -> KvEntry {
        KvEntry {
            key: self.key.clone(),
            value: Some(self.value.clone()),
            versionstamp: Some(self.versionstamp),
        }
    }
}

#[derive(Default)]
struct KvState {
    /// Encoded key -> slot.
    entries: BTreeMap<Vec<u8>, Slot>,
    /// (expires_at, encoded key) for every slot written with a TTL.
    expiry: BTreeSet<(i64, Vec<u8>)>,
    /// Sequence number of the last committed batch.
    sequence: u64,
}

impl KvState {
    fn live(&self, encoded: &[u8], now: i64) -> Option<&Slot> {
        self.entries.get(encoded).filter(|slot| slot.is_live(now))
    }

    fn remove(&mut self, encoded: &[u8]) {
        if let Some(old) = self.entries.remove(encoded) {
            if let Some(at) = old.expires_at {
                self.expiry.remove(&(at, encoded.to_vec()));
            }
        }
    }

    fn insert(&mut self, encoded: Vec<u8>, slot: Slot) {
        self.remove(&encoded);
        if let Some(at) = slot.expires_at {
            self.expiry.insert((at, encoded.clone()));
        }
        self.entries.insert(encoded, slot);
    }

    /// Remove every slot whose expiry is at or before `now`.
    fn sweep(&mut self, now: i64) -> usize {
        let mut removed = 0;
        while let Some((at, _)) = self.expiry.first() {
            if *at > now {
                break;
            }
            if let Some((_, encoded)) = self.expiry.pop_first() {
                self.entries.remove(&encoded);
                removed += 1;
            }
        }
        removed
    }

    fn apply(&mut self, versionstamp: Versionstamp, ops: Vec<WalOp>) {
        for op in ops {
            match op {
                WalOp::Set {
                    key,
                    value,
                    expires_at,
                } => {
                    let encoded = key.encode();
                    self.insert(
                        encoded,
                        Slot {
                            key,
                            value,
                            versionstamp,
                            expires_at,
                        },
                    );
                }
                WalOp::Delete { key } => self.remove(&key.encode()),
            }
        }
        self.sequence = self.sequence.max(versionstamp.0);
    }
}

/// Absolute expiry of a key written at `now`; TTLs past `i64::MAX` ms never expire.
fn expiry_after(now: i64, ttl: Duration) -> i64 {
    now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

/// Ordered key-value engine held in memory, optionally journaled to a
/// write-ahead log.
///
/// Reads share a read lock; commits take the write lock, sweep expired keys,
/// evaluate checks, journal the batch, then apply it. A batch is either fully
/// visible to readers or not at all.
pub struct KvEngine {
    state: RwLock<KvState>,
    clock: Arc<dyn Clock>,
    wal: Option<WriteAheadLog>,
}

impl KvEngine {
    /// A volatile engine with no journal.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(KvState::default()),
            clock,
            wal: None,
        }
    }

    /// Open a journaled engine, replaying the log at `path` if it exists.
    pub fn open(path: &Path, config: KvConfig, clock: Arc<dyn Clock>) -> KvResult<Self> {
        let wal = WriteAheadLog::open(path, config.sync_mode)?;
        let mut state = KvState::default();
        let records = wal.recover()?;
        let replayed = records.len();
        for record in records {
            state.apply(Versionstamp(record.versionstamp), record.ops);
        }
        let expired = state.sweep(clock.now_ms());

        info!(
            path = %path.display(),
            replayed,
            keys = state.entries.len(),
            expired,
            "kv engine opened"
        );
        Ok(Self {
            state: RwLock::new(state),
            clock,
            wal: Some(wal),
        })
    }

    /// Number of keys currently stored, including expired keys not yet swept.
    ///
    /// Still counts after a writer panicked and poisoned the state lock.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite the journal so it holds only live keys.
    ///
    /// A no-op for in-memory engines.
    pub fn compact(&self) -> KvResult<()> {
        let Some(wal) = &self.wal else {
            return Ok(());
        };
        let mut state = self.write_state()?;
        state.sweep(self.clock.now_ms());
        let records: Vec<WalRecord> = state
            .entries
            .values()
            .map(|slot| WalRecord {
                versionstamp: slot.versionstamp.0,
                ops: vec![WalOp::Set {
                    key: slot.key.clone(),
                    value: slot.value.clone(),
                    expires_at: slot.expires_at,
                }],
            })
            .collect();
        wal.rewrite(&records)?;
        info!(keys = records.len(), "kv journal compacted");
        Ok(())
    }

    fn read_state(&self) -> KvResult<RwLockReadGuard<'_, KvState>> {
        self.state.read().map_err(|_| KvError::LockPoisoned)
    }

    fn write_state(&self) -> KvResult<RwLockWriteGuard<'_, KvState>> {
        self.state.write().map_err(|_| KvError::LockPoisoned)
    }
}

impl KvStore for KvEngine {
    fn get(&self, key: &Key) -> KvResult<KvEntry> {
        if key.is_empty() {
            return Err(KvError::EmptyKey);
        }
        let now = self.clock.now_ms();
        let state = self.read_state()?;
        Ok(state
            .live(&key.encode(), now)
            .map(Slot::to_entry)
            .unwrap_or_else(|| KvEntry::absent(key.clone())))
    }

    fn get_many(&self, keys: &[Key]) -> KvResult<Vec<KvEntry>> {
        if keys.iter().any(Key::is_empty) {
            return Err(KvError::EmptyKey);
        }
        let now = self.clock.now_ms();
        let state = self.read_state()?;
        Ok(keys
            .iter()
            .map(|key| {
                state
                    .live(&key.encode(), now)
                    .map(Slot::to_entry)
                    .unwrap_or_else(|| KvEntry::absent(key.clone()))
            })
            .collect())
    }

    fn scan(
        &self,
        prefix: &Key,
        cursor: Option<&Key>,
        reverse: bool,
        limit: usize,
    ) -> KvResult<Vec<KvEntry>> {
        let (lo, hi) = prefix.child_range();
        let cursor = cursor.map(Key::encode);
        if let Some(c) = &cursor {
            if *c <= lo || *c >= hi {
                return Ok(Vec::new());
            }
        }
        let (lower, upper) = match (&cursor, reverse) {
            (Some(c), false) => (Bound::Excluded(c.clone()), Bound::Excluded(hi)),
            (Some(c), true) => (Bound::Excluded(lo), Bound::Excluded(c.clone())),
            (None, _) => (Bound::Excluded(lo), Bound::Excluded(hi)),
        };

        let now = self.clock.now_ms();
        let state = self.read_state()?;
        let range = state.entries.range::<Vec<u8>, _>((lower, upper));
        let live = |(_, slot): (&Vec<u8>, &Slot)| slot.is_live(now).then(|| slot.to_entry());
        let page = if reverse {
            range.rev().filter_map(live).take(limit).collect()
        } else {
            range.filter_map(live).take(limit).collect()
        };
        Ok(page)
    }

    fn commit(&self, checks: &[Check], mutations: &[Mutation]) -> KvResult<CommitResult> {
        if mutations.iter().any(|m| m.key().is_empty()) {
            return Err(KvError::EmptyKey);
        }
        let now = self.clock.now_ms();
        let mut state = self.write_state()?;

        let swept = state.sweep(now);
        if swept > 0 {
            debug!(swept, "expired keys removed before commit");
        }

        for check in checks {
            let current = state.live(&check.key.encode(), now).map(|s| s.versionstamp);
            if current != check.versionstamp {
                debug!(
                    key = %check.key,
                    expected = ?check.versionstamp,
                    current = ?current,
                    "commit conflict"
                );
                return Ok(CommitResult::Conflict);
            }
        }

        let versionstamp = Versionstamp(state.sequence + 1);
        let ops: Vec<WalOp> = mutations
            .iter()
            .map(|m| match m {
                Mutation::Set {
                    key,
                    value,
                    expire_in,
                } => WalOp::Set {
                    key: key.clone(),
                    value: value.clone(),
                    expires_at: expire_in.map(|ttl| expiry_after(now, ttl)),
                },
                Mutation::Delete { key } => WalOp::Delete { key: key.clone() },
            })
            .collect();

        if let Some(wal) = &self.wal {
            wal.append(&WalRecord {
                versionstamp: versionstamp.0,
                ops: ops.clone(),
            })?;
        }
        state.apply(versionstamp, ops);

        debug!(
            %versionstamp,
            checks = checks.len(),
            mutations = mutations.len(),
            "batch committed"
        );
        Ok(CommitResult::Committed { versionstamp })
    }

    fn purge_expired(&self) -> KvResult<usize> {
        let now = self.clock.now_ms();
        let removed = self.write_state()?.sweep(now);
        if removed > 0 {
            debug!(removed, "expired keys purged");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for KvEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvEngine")
            .field("key_count", &self.len())
            .field("wal", &self.wal)
            .finish()
    }
}
