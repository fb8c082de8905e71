//! Ordered, transactional key-value engine for the drawings service.
//!
//! Keys are sequences of typed parts ([`Key`], [`KeyPart`]) ordered part by
//! part. Every read returns a [`Versionstamp`] that a later
//! [`AtomicOperation`] can require to be unchanged at commit time; a batch
//! either applies completely or not at all.
//!
//! # Storage Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`KvEngine::in_memory`] -- volatile, for tests and embedding
//! - [`KvEngine::open`] -- the same engine journaled to a [`WriteAheadLog`]
//!
//! # Design Rules
//!
//! 1. A lost optimistic race is an outcome ([`CommitResult::Conflict`]), not an error.
//! 2. Absence is a valid version: checking `None` asserts the key does not exist.
//! 3. TTL expiry belongs to the engine. Expired keys read as absent and are
//!    swept before every commit and by [`KvStore::purge_expired`].
//! 4. Scans are lazy and page through the store with a cursor; no lock is
//!    held between pages.
//! 5. A batch is journaled before it becomes visible.

pub mod atomic;
pub mod clock;
pub mod engine;
pub mod entry;
pub mod error;
pub mod key;
pub mod list;
pub mod traits;
pub mod wal;

pub use atomic::AtomicOperation;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{KvConfig, KvEngine};
pub use entry::{Check, CommitResult, KvEntry, Mutation, Versionstamp};
pub use error::{KvError, KvResult};
pub use key::{Key, KeyPart};
pub use list::{KvList, ListOptions};
pub use traits::KvStore;
pub use wal::{SyncMode, WriteAheadLog};
