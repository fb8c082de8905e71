//! The stored form of a drawing.

use serde::{Deserialize, Serialize};

use crate::error::{DrawingsError, DrawingsResult};

/// Value stored under `drawings/{id}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawingRecord {
    /// Packed 4-bit pixels.
    pub bytes: Vec<u8>,
    /// Creation time, epoch milliseconds.
    pub date: i64,
    /// Gallery the drawing was shared to.
    pub gallery: String,
    /// Rank after the last bump; `None` until first bumped.
    pub score: Option<i64>,
}

impl DrawingRecord {
    /// The value gallery index keys are ordered by.
    pub fn rank(&self) -> i64 {
        self.score.unwrap_or(self.date)
    }

    pub fn encode(&self) -> DrawingsResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| DrawingsError::Record(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> DrawingsResult<Self> {
        bincode::deserialize(bytes).map_err(|e| DrawingsError::Record(e.to_string()))
    }
}
