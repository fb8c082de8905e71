//! Sharing, bumping and browsing drawings.
//!
//! Every operation is a handful of reads followed by at most one atomic
//! batch whose checks cover everything the reads decided on. A batch that
//! loses a race is reported as [`DrawingsError::Conflict`] and not retried.

use std::sync::Arc;

use drawings_kv::{Clock, CommitResult, KvEntry, KvStore, ListOptions};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bitmap::{is_blank, RasterEncoder};
use crate::config::DrawingsConfig;
use crate::error::{DrawingsError, DrawingsResult};
use crate::ids::{self, DrawingId};
use crate::keys::{self, MARKER};
use crate::names::{
    display_name, validate_gallery_name, validate_listing_name, ALL_GALLERY, PUBLIC_GALLERY,
};
use crate::record::DrawingRecord;

/// Whether the viewing address may bump a drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BumpState {
    /// The drawing is not in the public gallery.
    NotBumpable,
    Available,
    AlreadyBumped,
}

/// A drawing's metadata as seen by one address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DrawingView {
    pub id: DrawingId,
    pub gallery: String,
    pub date: i64,
    pub score: Option<i64>,
    pub bump: BumpState,
}

/// The newest drawings of one gallery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GalleryListing {
    pub name: String,
    /// Heading to show; `None` for the public front page.
    pub title: Option<String>,
    /// `false` for galleries nothing can be shared to directly.
    pub shareable: bool,
    /// Highest rank first.
    pub ids: Vec<DrawingId>,
}

/// The drawings protocol over a key-value store.
pub struct Drawings<S: KvStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: DrawingsConfig,
}

impl<S: KvStore> Clone for Drawings<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<S: KvStore> Drawings<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: DrawingsConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &DrawingsConfig {
        &self.config
    }

    /// Store a new drawing in `gallery` on behalf of `address`.
    ///
    /// Writes the record, its entries in `gallery` and `all`, and the
    /// address's share cooldown in one batch.
    pub fn share(&self, bytes: &[u8], gallery: &str, address: &str) -> DrawingsResult<DrawingId> {
        self.config.canvas().check_len(bytes)?;
        if is_blank(bytes) {
            return Err(DrawingsError::InvalidDrawing {
                reason: "drawing is blank".into(),
            });
        }
        validate_gallery_name(gallery)?;

        let cooldown_key = keys::share_marker(address);
        let cooldown = self.store.get(&cooldown_key)?;
        if cooldown.exists() {
            return Err(DrawingsError::RateLimited);
        }

        let (id, slot) = ids::allocate(self.store.as_ref(), &mut rand::thread_rng())?;
        let date = self.clock.now_ms();
        let record = DrawingRecord {
            bytes: bytes.to_vec(),
            date,
            gallery: gallery.to_string(),
            score: None,
        };

        let result = self
            .store
            .atomic()
            .check(&cooldown)
            .check(&slot)
            .set_with_ttl(cooldown_key, MARKER, self.config.share_cooldown())
            .set(keys::drawing(&id), record.encode()?)
            .set(keys::gallery_entry(gallery, date, &id), MARKER)
            .set(keys::gallery_entry(ALL_GALLERY, date, &id), MARKER)
            .commit()?;

        match result {
            CommitResult::Committed { .. } => {
                info!(%id, gallery, "drawing shared");
                Ok(id)
            }
            CommitResult::Conflict => {
                debug!(%id, address, "share lost a race");
                Err(DrawingsError::Conflict)
            }
        }
    }

    /// Move a public drawing up the front page. Returns its new score.
    ///
    /// The new score is the floored midpoint of the current rank and now, so
    /// repeated bumps converge on the present without overtaking it.
    pub fn bump(&self, id: &DrawingId, address: &str) -> DrawingsResult<i64> {
        let record_key = keys::drawing(id);
        let marker_key = keys::bump_marker(address, id);
        let [record_entry, marker_entry] = self.read_pair(&record_key, &marker_key)?;

        let record = self.decode_record(id, &record_entry)?;
        if record.gallery != PUBLIC_GALLERY {
            return Err(DrawingsError::WrongGallery { id: id.to_string() });
        }
        if marker_entry.exists() {
            return Err(DrawingsError::AlreadyBumped { id: id.to_string() });
        }

        let old = record.rank();
        let old_index_key = keys::gallery_entry(PUBLIC_GALLERY, old, id);
        let old_index = self.store.get(&old_index_key)?;
        if !old_index.exists() {
            warn!(%id, rank = old, "public index entry missing");
            return Err(DrawingsError::IndexInconsistent { id: id.to_string() });
        }

        let now = self.clock.now_ms();
        let new = midpoint(old, now);
        let updated = DrawingRecord {
            score: Some(new),
            ..record
        };

        let result = self
            .store
            .atomic()
            .check(&record_entry)
            .check(&marker_entry)
            .check(&old_index)
            .delete(old_index_key)
            .set(keys::gallery_entry(PUBLIC_GALLERY, new, id), MARKER)
            .set_with_ttl(marker_key, MARKER, self.config.bump_cooldown())
            .set(record_key, updated.encode()?)
            .commit()?;

        match result {
            CommitResult::Committed { .. } => {
                info!(%id, old, new, "drawing bumped");
                Ok(new)
            }
            CommitResult::Conflict => {
                debug!(%id, address, "bump lost a race");
                Err(DrawingsError::Conflict)
            }
        }
    }

    /// Ids in `name`, highest rank first, capped at the configured limit.
    pub fn gallery(&self, name: &str) -> DrawingsResult<GalleryListing> {
        validate_listing_name(name)?;

        let options = ListOptions::default()
            .reverse()
            .limit(self.config.gallery_limit);
        let mut ids = Vec::new();
        for entry in self.store.list(keys::gallery_prefix(name), options) {
            let entry = entry?;
            match keys::id_of_gallery_entry(&entry.key) {
                Some(id) => ids.push(id),
                None => warn!(key = %entry.key, "skipping malformed gallery entry"),
            }
        }

        let title = match name {
            PUBLIC_GALLERY => None,
            ALL_GALLERY => Some("all drawings".to_string()),
            other => Some(display_name(other)),
        };
        Ok(GalleryListing {
            name: name.to_string(),
            title,
            shareable: name != ALL_GALLERY,
            ids,
        })
    }

    /// Metadata of one drawing, including whether `address` may bump it.
    pub fn drawing(&self, id: &DrawingId, address: &str) -> DrawingsResult<DrawingView> {
        let [record_entry, marker_entry] =
            self.read_pair(&keys::drawing(id), &keys::bump_marker(address, id))?;
        let record = self.decode_record(id, &record_entry)?;

        let bump = if record.gallery != PUBLIC_GALLERY {
            BumpState::NotBumpable
        } else if marker_entry.exists() {
            BumpState::AlreadyBumped
        } else {
            BumpState::Available
        };
        Ok(DrawingView {
            id: id.clone(),
            gallery: record.gallery,
            date: record.date,
            score: record.score,
            bump,
        })
    }

    /// Render a stored drawing with `encoder`.
    pub fn image(&self, id: &DrawingId, encoder: &dyn RasterEncoder) -> DrawingsResult<Vec<u8>> {
        let entry = self.store.get(&keys::drawing(id))?;
        let record = self.decode_record(id, &entry)?;
        let canvas = self.config.canvas();
        let rgba = canvas
            .to_rgba(&record.bytes)
            .map_err(|e| DrawingsError::Record(format!("drawing {id}: {e}")))?;
        Ok(encoder.encode(canvas.width, canvas.height, &rgba)?)
    }

    /// Resolve the gallery a new drawing will be shared to.
    pub fn validate_draw_target(&self, name: Option<&str>) -> DrawingsResult<String> {
        let name = name.filter(|n| !n.is_empty()).unwrap_or(PUBLIC_GALLERY);
        validate_gallery_name(name)?;
        Ok(name.to_string())
    }

    fn read_pair(
        &self,
        first: &drawings_kv::Key,
        second: &drawings_kv::Key,
    ) -> DrawingsResult<[KvEntry; 2]> {
        let entries = self.store.get_many(&[first.clone(), second.clone()])?;
        entries.try_into().map_err(|got: Vec<KvEntry>| {
            DrawingsError::Record(format!("expected 2 entries, store returned {}", got.len()))
        })
    }

    fn decode_record(&self, id: &DrawingId, entry: &KvEntry) -> DrawingsResult<DrawingRecord> {
        match &entry.value {
            Some(value) => DrawingRecord::decode(value),
            None => Err(DrawingsError::NotFound { id: id.to_string() }),
        }
    }
}

/// `floor((a + b) / 2)` without overflow.
fn midpoint(a: i64, b: i64) -> i64 {
    ((a as i128 + b as i128).div_euclid(2)) as i64
}
