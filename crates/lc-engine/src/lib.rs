//! Record/playback engine for loopcore.
//!
//! Owns the looper context: tracks, transport, tick clock, and scenes.
//! Driven by a 1 ms tick from outside; emits through an injected
//! [`MessageSink`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod engine;
mod scene;
mod sink;

pub use engine::{ClipSnapshot, EngineError, EventView, LoopEngine, SourceId};
pub use scene::{SceneBank, SceneChain, SceneSlot, MAX_SCENES};
pub use sink::{Humanizer, MessageSink, NoHumanize};

/// Number of looper tracks, fixed at build time.
pub const MAX_TRACKS: usize = 4;
