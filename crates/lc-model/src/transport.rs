//! Process-wide transport settings.

/// Lowest accepted tempo.
pub const MIN_BPM: u16 = 20;
/// Highest accepted tempo.
pub const MAX_BPM: u16 = 300;

/// Tempo, time signature, and the auto-loop flag.
///
/// Single instance per engine; mutated only through
/// [`sanitized`](Transport::sanitized) values so the tick clock never sees
/// an out-of-range tempo or a zero time signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transport {
    /// Beats per minute, clamped to 20..=300.
    pub bpm: u16,
    pub ts_num: u8,
    pub ts_den: u8,
    /// When set, recording stops (flips to play) at a known loop length.
    pub auto_loop: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self { bpm: 120, ts_num: 4, ts_den: 4, auto_loop: true }
    }
}

impl Transport {
    /// Copy with tempo clamped and zero time-signature fields coerced to 4.
    pub fn sanitized(self) -> Self {
        Self {
            bpm: self.bpm.clamp(MIN_BPM, MAX_BPM),
            ts_num: if self.ts_num == 0 { 4 } else { self.ts_num },
            ts_den: if self.ts_den == 0 { 4 } else { self.ts_den },
            auto_loop: self.auto_loop,
        }
    }
}
