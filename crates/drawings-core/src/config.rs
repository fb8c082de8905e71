//! Tunables of the sharing and ranking protocol.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bitmap::Canvas;

/// Protocol configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingsConfig {
    /// How long an address must wait between shares.
    pub share_cooldown_ms: u64,
    /// How long an address is barred from bumping the same drawing again.
    pub bump_cooldown_ms: u64,
    /// Maximum number of ids returned by a gallery listing.
    pub gallery_limit: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for DrawingsConfig {
    fn default() -> Self {
        Self {
            share_cooldown_ms: 15_000,
            bump_cooldown_ms: 86_400_000,
            gallery_limit: 200,
            canvas_width: Canvas::DEFAULT.width,
            canvas_height: Canvas::DEFAULT.height,
        }
    }
}

impl DrawingsConfig {
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.canvas_width,
            height: self.canvas_height,
        }
    }

    pub fn share_cooldown(&self) -> Duration {
        Duration::from_millis(self.share_cooldown_ms)
    }

    pub fn bump_cooldown(&self) -> Duration {
        Duration::from_millis(self.bump_cooldown_ms)
    }
}
