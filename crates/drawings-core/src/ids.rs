//! Drawing identifiers and their allocation.

use std::fmt;

use drawings_kv::{KeyPart, KvEntry, KvStore};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::DrawingsResult;
use crate::keys;

/// Number of letters in a drawing id.
pub const ID_LEN: usize = 8;

/// An 8-letter lowercase drawing identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DrawingId(String);

impl DrawingId {
    /// Derive an id from a random value: eight base-26 digits, least
    /// significant first, each mapped to `'a'..='z'`.
    pub fn from_random(mut value: u64) -> Self {
        let mut id = String::with_capacity(ID_LEN);
        for _ in 0..ID_LEN {
            id.push(char::from(b'a' + (value % 26) as u8));
            value /= 26;
        }
        Self(id)
    }

    /// Parse a path segment; `None` unless it is exactly 8 lowercase letters.
    pub fn parse(s: &str) -> Option<Self> {
        (s.len() == ID_LEN && s.bytes().all(|b| b.is_ascii_lowercase()))
            .then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&DrawingId> for KeyPart {
    fn from(id: &DrawingId) -> Self {
        KeyPart::Str(id.0.clone())
    }
}

/// Pick an id no stored drawing uses yet.
///
/// Redraws until the `drawings/{id}` read comes back absent. The returned
/// entry carries that absence and must be checked by the creating
/// transaction, so two writers that drew the same id cannot both commit.
pub fn allocate<S, R>(store: &S, rng: &mut R) -> DrawingsResult<(DrawingId, KvEntry)>
where
    S: KvStore + ?Sized,
    R: Rng,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let id = DrawingId::from_random(rng.gen::<u64>());
        let entry = store.get(&keys::drawing(&id))?;
        if !entry.exists() {
            if attempts > 1 {
                debug!(%id, attempts, "id allocated after collisions");
            }
            return Ok((id, entry));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawings_kv::{KvEngine, ManualClock};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn from_random_digits_are_little_endian() {
        assert_eq!(DrawingId::from_random(0).as_str(), "aaaaaaaa");
        assert_eq!(DrawingId::from_random(1).as_str(), "baaaaaaa");
        assert_eq!(DrawingId::from_random(26).as_str(), "abaaaaaa");
        assert_eq!(DrawingId::from_random(25 + 26 * 2).as_str(), "zcaaaaaa");
    }

    #[test]
    fn from_random_treats_value_as_unsigned() {
        let id = DrawingId::from_random(u64::MAX);
        assert_eq!(id.as_str().len(), ID_LEN);
        assert!(DrawingId::parse(id.as_str()).is_some());
    }

    #[test]
    fn parse_accepts_only_eight_lowercase_letters() {
        assert!(DrawingId::parse("abcdefgh").is_some());
        assert!(DrawingId::parse("abcdefg").is_none());
        assert!(DrawingId::parse("abcdefghi").is_none());
        assert!(DrawingId::parse("abcdEfgh").is_none());
        assert!(DrawingId::parse("abcd3fgh").is_none());
        assert!(DrawingId::parse("abcdefgh.png").is_none());
    }

    #[test]
    fn allocated_ids_are_eight_lowercase_letters() {
        let store = KvEngine::in_memory(Arc::new(ManualClock::new(0)));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let (id, entry) = allocate(&store, &mut rng).unwrap();
            assert_eq!(id.as_str().len(), ID_LEN);
            assert!(id.as_str().bytes().all(|b| b.is_ascii_lowercase()));
            assert!(!entry.exists());
        }
    }

    #[test]
    fn allocation_skips_taken_ids() {
        let store = KvEngine::in_memory(Arc::new(ManualClock::new(0)));

        let mut twin = StdRng::seed_from_u64(42);
        let first = DrawingId::from_random(twin.gen::<u64>());
        let second = DrawingId::from_random(twin.gen::<u64>());
        store
            .atomic()
            .set(keys::drawing(&first), vec![0])
            .commit()
            .unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let (id, entry) = allocate(&store, &mut rng).unwrap();
        assert_eq!(id, second);
        assert_eq!(entry.key, keys::drawing(&second));
    }
}
