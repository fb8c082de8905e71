//! Error types for sharing, bumping and browsing drawings.

use drawings_kv::KvError;
use thiserror::Error;

use crate::bitmap::BitmapError;

/// Errors that can occur in drawings operations.
#[derive(Debug, Error)]
pub enum DrawingsError {
    /// The submitted buffer has the wrong shape or is blank.
    #[error("invalid drawing: {reason}")]
    InvalidDrawing { reason: String },

    /// The gallery name does not satisfy the naming rules.
    #[error("invalid gallery name {name:?}: {reason}")]
    InvalidGalleryName { name: String, reason: String },

    /// The caller's address shared a drawing too recently.
    #[error("wait a few seconds before sharing again")]
    RateLimited,

    /// No drawing with this id exists.
    #[error("drawing not found: {id}")]
    NotFound { id: String },

    /// Only drawings in the public gallery can be bumped.
    #[error("drawing {id} is not in the public gallery")]
    WrongGallery { id: String },

    /// The caller's address already bumped this drawing.
    #[error("drawing {id} was already bumped from this address")]
    AlreadyBumped { id: String },

    /// A concurrent request changed the data this one read. Safe to retry.
    #[error("concurrent update; try again")]
    Conflict,

    /// A drawing record has no matching gallery index entry.
    #[error("gallery index entry missing for drawing {id}")]
    IndexInconsistent { id: String },

    /// A stored record could not be decoded or encoded.
    #[error("record encoding error: {0}")]
    Record(String),

    /// Image container encoding failed.
    #[error(transparent)]
    Raster(#[from] crate::bitmap::RasterError),

    /// The key-value engine failed.
    #[error("store error: {0}")]
    Store(#[from] KvError),
}

impl DrawingsError {
    /// `true` for the transient outcome of a lost optimistic race.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// `true` for failures of the service itself rather than of the request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::IndexInconsistent { .. } | Self::Record(_) | Self::Raster(_) | Self::Store(_)
        )
    }
}

impl From<BitmapError> for DrawingsError {
    fn from(e: BitmapError) -> Self {
        Self::InvalidDrawing {
            reason: e.to_string(),
        }
    }
}

/// Convenience type alias for drawings operations.
pub type DrawingsResult<T> = Result<T, DrawingsError>;
