//! Discontinuous transmission decisions.
//!
//! Inactivity is accumulated in half-millisecond units so that 2.5 ms
//! frames count exactly. Once more than 200 ms of inactivity has been seen,
//! frames are suppressed; after 20 further suppressed 20 ms frames one frame
//! is let through so the far end keeps refreshing its comfort noise.

use tracing::trace;

/// Inactive frames, in 20 ms units, before suppression starts.
pub const SPEECH_FRAMES_BEFORE_DTX: u32 = 10;

/// Suppressed frames, in 20 ms units, before a refresh frame is sent.
pub const MAX_CONSECUTIVE_DTX: u32 = 20;

/// Mean square amplitude below which a frame is treated as inactive.
pub const ACTIVITY_THRESHOLD: f64 = 32.0 * 32.0;

const START_Q1: u32 = SPEECH_FRAMES_BEFORE_DTX * 20 * 2;
const REFRESH_Q1: u32 = (SPEECH_FRAMES_BEFORE_DTX + MAX_CONSECUTIVE_DTX) * 20 * 2;

/// Returns true if `pcm` carries signal above the activity threshold.
pub fn is_active(pcm: &[i16]) -> bool {
    if pcm.is_empty() {
        return false;
    }
    let energy: f64 = pcm.iter().map(|&s| (s as f64) * (s as f64)).sum();
    energy / pcm.len() as f64 > ACTIVITY_THRESHOLD
}

/// Tracks accumulated inactivity for one encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DtxTracker {
    inactive_q1: u32,
}

impl DtxTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one frame and returns true if it should be suppressed.
    ///
    /// `frame_us` is the frame length in microseconds.
    pub fn update(&mut self, active: bool, frame_us: u32) -> bool {
        if active {
            self.inactive_q1 = 0;
            return false;
        }

        self.inactive_q1 = self.inactive_q1.saturating_add(frame_us / 500);
        let suppress = if self.inactive_q1 <= START_Q1 {
            false
        } else if self.inactive_q1 <= REFRESH_Q1 {
            true
        } else {
            self.inactive_q1 = START_Q1;
            false
        };

        trace!(inactive_q1 = self.inactive_q1, suppress, "dtx decision");
        suppress
    }

    /// Forgets accumulated inactivity.
    pub fn reset(&mut self) {
        self.inactive_q1 = 0;
    }
}
