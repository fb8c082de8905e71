//! Anonymous drawing sharing on top of [`drawings_kv`].
//!
//! Drawings are fixed-size 4-bit palette bitmaps ([`bitmap`]) stored under
//! random 8-letter ids ([`ids`]) and indexed into named galleries. The
//! [`Drawings`] service implements the three write/read paths:
//!
//! - **share**: store a drawing and index it in its gallery and in `all`
//! - **bump**: move a public drawing halfway towards the present
//! - **gallery**: list a gallery, highest rank first
//!
//! Each write is a single optimistic batch. Rate limits are TTL keys the
//! store expires on its own.

pub mod bitmap;
pub mod config;
pub mod error;
pub mod ids;
pub mod keys;
pub mod names;
pub mod record;
pub mod service;

pub use bitmap::{Canvas, RasterEncoder, RasterError, PALETTE};
pub use config::DrawingsConfig;
pub use error::{DrawingsError, DrawingsResult};
pub use ids::DrawingId;
pub use names::{normalize_gallery_name, ALL_GALLERY, PUBLIC_GALLERY};
pub use record::DrawingRecord;
pub use service::{BumpState, DrawingView, Drawings, GalleryListing};
