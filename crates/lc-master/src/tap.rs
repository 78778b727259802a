//! Tap tempo detection.

use std::time::{Duration, Instant};

use arrayvec::ArrayVec;
use lc_model::{MAX_BPM, MIN_BPM};

/// Sliding window size.
const MAX_TAPS: usize = 8;
/// A pause longer than this starts a fresh measurement.
const TAP_TIMEOUT: Duration = Duration::from_millis(2000);

/// Derives a tempo from repeated button taps.
///
/// Keeps up to [`MAX_TAPS`] timestamps and averages the intervals across
/// the window, so the estimate steadies as taps accumulate.
#[derive(Debug)]
pub struct TapTempo {
    taps: ArrayVec<Instant, MAX_TAPS>,
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new()
    }
}

impl TapTempo {
    pub fn new() -> Self {
        Self { taps: ArrayVec::new() }
    }

    /// Register a tap now; returns the tempo estimate once two or more
    /// taps are in the window.
    pub fn tap(&mut self) -> Option<u16> {
        self.tap_at(Instant::now())
    }

    /// Register a tap at an explicit timestamp.
    pub fn tap_at(&mut self, now: Instant) -> Option<u16> {
        if let Some(&last) = self.taps.last() {
            if now.duration_since(last) > TAP_TIMEOUT {
                self.taps.clear();
            }
        }
        if self.taps.is_full() {
            self.taps.remove(0);
        }
        self.taps.push(now);

        if self.taps.len() < 2 {
            return None;
        }
        let span = now.duration_since(self.taps[0]);
        let avg_ms = span.as_millis() as u64 / (self.taps.len() as u64 - 1);
        if avg_ms == 0 {
            return None;
        }
        let bpm = (60_000 / avg_ms).min(u16::MAX as u64) as u16;
        Some(bpm.clamp(MIN_BPM, MAX_BPM))
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}
