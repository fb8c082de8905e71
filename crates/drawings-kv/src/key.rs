//! Typed keys and their order-preserving byte encoding.
//!
//! A [`Key`] is a sequence of [`KeyPart`]s. Keys compare part by part; a key
//! sorts before every key it is a strict prefix of. Within a part, strings
//! sort before integers, strings compare bytewise and integers numerically.
//!
//! The engine stores keys under [`Key::encode`], whose bytewise order is the
//! same as the order of the keys themselves:
//!
//! ```text
//! Str  => 0x02, bytes with 0x00 escaped as 0x00 0xFF, 0x00 terminator
//! Int  => 0x03, 8 bytes big-endian with the sign bit flipped
//! ```
//!
//! Every part starts with a tag in `0x02..=0x03`, so all keys extending a
//! prefix `p` encode strictly between `enc(p) ++ [0x00]` and
//! `enc(p) ++ [0xFF]`.

use std::fmt;

use serde::{Deserialize, Serialize};

const TAG_STR: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const ESCAPE: u8 = 0xFF;

/// One component of a [`Key`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Str(String),
    Int(i64),
}

impl KeyPart {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(_) => None,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Str(s) => {
                out.push(TAG_STR);
                for &b in s.as_bytes() {
                    out.push(b);
                    if b == 0x00 {
                        out.push(ESCAPE);
                    }
                }
                out.push(0x00);
            }
            Self::Int(n) => {
                out.push(TAG_INT);
                out.extend_from_slice(&((*n as u64) ^ (1 << 63)).to_be_bytes());
            }
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for KeyPart {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<i64> for KeyPart {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

/// An ordered, typed key.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key(Vec<KeyPart>);

impl Key {
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn part(&self, index: usize) -> Option<&KeyPart> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new key with `part` appended.
    pub fn child(&self, part: impl Into<KeyPart>) -> Self {
        let mut parts = self.0.clone();
        parts.push(part.into());
        Self(parts)
    }

    /// Returns `true` if `prefix` is a (not necessarily strict) prefix of this key.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Order-preserving byte encoding.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * 10);
        for part in &self.0 {
            part.encode_into(&mut out);
        }
        out
    }

    /// Exclusive byte bounds containing every key that strictly extends this one.
    pub(crate) fn child_range(&self) -> (Vec<u8>, Vec<u8>) {
        let base = self.encode();
        let mut lo = base.clone();
        lo.push(0x00);
        let mut hi = base;
        hi.push(0xFF);
        (lo, hi)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{part}")?;
        }
        write!(f, "]")
    }
}

/// Build a [`Key`] from anything convertible into [`KeyPart`].
///
/// ```
/// use drawings_kv::{key, KeyPart};
///
/// let k = key!["galleries", "public", 1000_i64, "abcdefgh"];
/// assert_eq!(k.part(2), Some(&KeyPart::Int(1000)));
/// ```
#[macro_export]
macro_rules! key {
    ($($part:expr),* $(,)?) => {
        $crate::Key::new(vec![$($crate::KeyPart::from($part)),*])
    };
}
