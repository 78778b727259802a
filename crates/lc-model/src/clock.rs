//! Millisecond-driven sequencer clock.

use crate::transport::{MAX_BPM, MIN_BPM};
use crate::PPQN;

const MS_PER_MINUTE: u32 = 60_000;

/// Converts tempo into per-millisecond tick advances with zero drift.
///
/// Each millisecond adds `bpm * PPQN` to an accumulator over a fixed
/// 60000 denominator; the integer quotient is yielded as the advance and
/// the remainder carries to the next cycle. The accumulated tick count is
/// therefore exactly `floor(elapsed_ms * bpm * PPQN / 60000)` no matter
/// how long the clock runs.
#[derive(Clone, Copy, Debug)]
pub struct TickClock {
    /// Per-millisecond numerator: `bpm * PPQN`. Never zero.
    rate: u32,
    /// Running remainder, always `< MS_PER_MINUTE`.
    acc: u32,
}

impl TickClock {
    pub fn new(bpm: u16) -> Self {
        let mut clock = Self { rate: 0, acc: 0 };
        clock.set_bpm(bpm);
        clock
    }

    /// Recompute the tick rate. The fractional phase is preserved so a
    /// tempo change mid-loop does not jump the clock.
    pub fn set_bpm(&mut self, bpm: u16) {
        let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.rate = bpm as u32 * PPQN;
    }

    /// Advance by one millisecond; returns the number of whole ticks due.
    pub fn advance_1ms(&mut self) -> u32 {
        self.acc += self.rate;
        let ticks = self.acc / MS_PER_MINUTE;
        self.acc %= MS_PER_MINUTE;
        ticks
    }

    /// Drop any fractional phase.
    pub fn reset(&mut self) {
        self.acc = 0;
    }
}
