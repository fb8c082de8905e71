//! Key layout of the drawings keyspace.
//!
//! ```text
//! drawings/{id}                        -> bincode DrawingRecord
//! galleries/{name}/{rank}/{id}         -> marker
//! addresses/{addr}/shared              -> marker, share-cooldown TTL
//! addresses/{addr}/bumped/{id}         -> marker, bump TTL
//! ```

use drawings_kv::{key, Key};

use crate::ids::DrawingId;

/// Value stored under index entries and rate-limit markers.
pub const MARKER: &[u8] = &[1];

pub fn drawing(id: &DrawingId) -> Key {
    key!["drawings", id]
}

pub fn gallery_prefix(name: &str) -> Key {
    key!["galleries", name]
}

pub fn gallery_entry(name: &str, rank: i64, id: &DrawingId) -> Key {
    key!["galleries", name, rank, id]
}

/// Drawing id of a gallery index key.
pub fn id_of_gallery_entry(key: &Key) -> Option<DrawingId> {
    key.part(3)
        .and_then(|part| part.as_str())
        .and_then(DrawingId::parse)
}

pub fn share_marker(address: &str) -> Key {
    key!["addresses", address, "shared"]
}

pub fn bump_marker(address: &str, id: &DrawingId) -> Key {
    key!["addresses", address, "bumped", id]
}
