//! Core looper types for loopcore.
//!
//! This crate defines the data model shared by the record/playback engine
//! and the persistence layer: short MIDI messages, the bounded tick-sorted
//! event store, the quantizer, the millisecond tick clock, and per-track
//! state. Everything here is fixed-capacity; nothing allocates.
//!
//! Designed to be `no_std` compatible.

#![cfg_attr(not(feature = "std"), no_std)]

mod clock;
mod event;
mod quantize;
mod store;
mod track;
mod transport;

pub use clock::TickClock;
pub use event::{LoopEvent, ShortMessage};
pub use quantize::{quantize, QuantizeGrid};
pub use store::{EventStore, StoreFull, MAX_EVENTS};
pub use track::{resolve_transition, ActiveNotes, Track, TrackState, Transition};
pub use transport::{Transport, MAX_BPM, MIN_BPM};

/// Sequencer resolution: ticks per quarter note.
pub const PPQN: u32 = 96;

/// Convert a loop length in beats to ticks.
pub const fn beats_to_ticks(beats: u16) -> u32 {
    beats as u32 * PPQN
}
