use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::key::Key;

/// Opaque version token stamped on every key written by a commit.
///
/// Versionstamps increase monotonically with each successful commit. A
/// missing versionstamp (`None`) is itself a valid token meaning "absent".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Versionstamp(pub(crate) u64);

impl Versionstamp {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Versionstamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:020x}", self.0)
    }
}

/// The result of a point read: the key, its value if live, and its version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KvEntry {
    pub key: Key,
    pub value: Option<Vec<u8>>,
    pub versionstamp: Option<Versionstamp>,
}

impl KvEntry {
    pub(crate) fn absent(key: Key) -> Self {
        Self {
            key,
            value: None,
            versionstamp: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }
}

/// A commit-time precondition: `key` must still carry `versionstamp`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Check {
    pub key: Key,
    pub versionstamp: Option<Versionstamp>,
}

impl From<&KvEntry> for Check {
    fn from(entry: &KvEntry) -> Self {
        Self {
            key: entry.key.clone(),
            versionstamp: entry.versionstamp,
        }
    }
}

/// A write inside an atomic batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Set {
        key: Key,
        value: Vec<u8>,
        expire_in: Option<Duration>,
    },
    Delete {
        key: Key,
    },
}

impl Mutation {
    pub fn key(&self) -> &Key {
        match self {
            Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Outcome of committing an atomic batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitResult {
    /// Every precondition held and every mutation was applied.
    Committed { versionstamp: Versionstamp },
    /// A precondition failed; nothing was applied.
    Conflict,
}

impl CommitResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    pub fn versionstamp(&self) -> Option<Versionstamp> {
        match self {
            Self::Committed { versionstamp } => Some(*versionstamp),
            Self::Conflict => None,
        }
    }
}
