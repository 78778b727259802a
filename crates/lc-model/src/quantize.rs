//! Tick quantization onto a configurable grid.

use crate::PPQN;

/// Note-duration grid recorded events are snapped to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuantizeGrid {
    #[default]
    Off,
    Sixteenth,
    Eighth,
    Quarter,
}

impl QuantizeGrid {
    /// Grid step in ticks; 0 disables quantization.
    pub const fn step_ticks(self) -> u32 {
        match self {
            Self::Off => 0,
            Self::Sixteenth => PPQN / 4,
            Self::Eighth => PPQN / 2,
            Self::Quarter => PPQN,
        }
    }

    /// Stable wire/disk encoding.
    pub const fn to_raw(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Sixteenth => 1,
            Self::Eighth => 2,
            Self::Quarter => 3,
        }
    }

    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Sixteenth),
            2 => Some(Self::Eighth),
            3 => Some(Self::Quarter),
            _ => None,
        }
    }
}

/// Snap `tick` to the nearest multiple of `step`.
///
/// Ties (`tick % step == step / 2`) round up. Deterministic and
/// bit-for-bit reproducible; `step == 0` passes the tick through.
pub const fn quantize(tick: u32, step: u32) -> u32 {
    if step == 0 {
        return tick;
    }
    let r = tick % step;
    let down = tick - r;
    if r < step / 2 {
        down
    } else {
        down + step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_steps_at_ppqn_96() {
        assert_eq!(QuantizeGrid::Off.step_ticks(), 0);
        assert_eq!(QuantizeGrid::Sixteenth.step_ticks(), 24);
        assert_eq!(QuantizeGrid::Eighth.step_ticks(), 48);
        assert_eq!(QuantizeGrid::Quarter.step_ticks(), 96);
    }

    #[test]
    fn off_passes_through() {
        assert_eq!(quantize(12345, 0), 12345);
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(quantize(5, 96), 0);
        assert_eq!(quantize(101, 96), 96);
        assert_eq!(quantize(199, 96), 192);
        assert_eq!(quantize(300, 96), 288);
    }

    #[test]
    fn tie_rounds_up() {
        assert_eq!(quantize(12, 24), 24);
        assert_eq!(quantize(48, 96), 96);
    }

    #[test]
    fn idempotent_for_all_grids() {
        for step in [24u32, 48, 96] {
            for t in 0..1000u32 {
                let q = quantize(t, step);
                assert_eq!(quantize(q, step), q, "t={} step={}", t, step);
            }
        }
    }

    #[test]
    fn raw_encoding_round_trips() {
        for g in [
            QuantizeGrid::Off,
            QuantizeGrid::Sixteenth,
            QuantizeGrid::Eighth,
            QuantizeGrid::Quarter,
        ] {
            assert_eq!(QuantizeGrid::from_raw(g.to_raw()), Some(g));
        }
        assert_eq!(QuantizeGrid::from_raw(9), None);
    }
}
