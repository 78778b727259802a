//! Scene snapshots: coarse arrangement switching over the same tracks.
//!
//! A scene stores only per-track metadata, never event data — recalling a
//! scene flips track states, it does not copy loops.

use arrayvec::ArrayString;

use crate::MAX_TRACKS;

/// Number of scene slots.
pub const MAX_SCENES: usize = 8;

/// Per-track metadata held by a scene. O(1) memory per slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneSlot {
    /// Whether this scene expects the track to play.
    pub has_clip: bool,
    /// Loop length in beats recorded with the snapshot (0 = auto).
    pub loop_beats: u16,
}

/// Automatic follow-up evaluated when track 0 wraps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneChain {
    pub next_scene: Option<u8>,
    pub enabled: bool,
}

/// The `[scene][track]` snapshot table plus names and chaining.
#[derive(Clone, Debug)]
pub struct SceneBank {
    slots: [[SceneSlot; MAX_TRACKS]; MAX_SCENES],
    names: [ArrayString<16>; MAX_SCENES],
    chains: [SceneChain; MAX_SCENES],
}

impl Default for SceneBank {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBank {
    pub fn new() -> Self {
        Self {
            slots: [[SceneSlot::default(); MAX_TRACKS]; MAX_SCENES],
            names: [ArrayString::new(); MAX_SCENES],
            chains: [SceneChain::default(); MAX_SCENES],
        }
    }

    pub fn slot(&self, scene: usize, track: usize) -> SceneSlot {
        self.slots[scene][track]
    }

    pub fn set_slot(&mut self, scene: usize, track: usize, slot: SceneSlot) {
        self.slots[scene][track] = slot;
    }

    pub fn name(&self, scene: usize) -> &str {
        &self.names[scene]
    }

    /// Set a scene name; truncated to the slot capacity.
    pub fn set_name(&mut self, scene: usize, name: &str) {
        let mut s = ArrayString::new();
        for c in name.chars() {
            if s.try_push(c).is_err() {
                break;
            }
        }
        self.names[scene] = s;
    }

    pub fn chain(&self, scene: usize) -> SceneChain {
        self.chains[scene]
    }

    pub fn set_chain(&mut self, scene: usize, chain: SceneChain) {
        self.chains[scene] = chain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_starts_empty() {
        let bank = SceneBank::new();
        for scene in 0..MAX_SCENES {
            for track in 0..MAX_TRACKS {
                assert!(!bank.slot(scene, track).has_clip);
            }
            assert_eq!(bank.name(scene), "");
            assert!(!bank.chain(scene).enabled);
        }
    }

    #[test]
    fn long_names_truncate() {
        let mut bank = SceneBank::new();
        bank.set_name(0, "a-very-long-scene-name-indeed");
        assert_eq!(bank.name(0).len(), 16);
        assert!("a-very-long-scene-name-indeed".starts_with(bank.name(0)));
    }

    #[test]
    fn chain_round_trips() {
        let mut bank = SceneBank::new();
        bank.set_chain(2, SceneChain { next_scene: Some(3), enabled: true });
        assert_eq!(bank.chain(2).next_scene, Some(3));
        assert!(bank.chain(2).enabled);
    }
}
