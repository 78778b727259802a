//! Per-track state: the record/play state machine and its data.

use crate::event::{LoopEvent, ShortMessage};
use crate::quantize::{quantize, QuantizeGrid};
use crate::store::{EventStore, StoreFull};
use crate::{beats_to_ticks, PPQN};

/// Looper track state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackState {
    #[default]
    Stop,
    Rec,
    Play,
    Overdub,
}

impl TrackState {
    /// True while the track accepts inbound messages.
    pub const fn is_recording(self) -> bool {
        matches!(self, Self::Rec | Self::Overdub)
    }

    /// True while the playback cursor advances.
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Play | Self::Overdub)
    }
}

/// What a state change does, expressed as data so the transition table can
/// be tested without a running clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub next: TrackState,
    /// Wipe the event store and undefine the loop length (entering Rec).
    pub clear_events: bool,
    /// Fix an undefined loop length from the write cursor (leaving Rec).
    pub fix_loop_len: bool,
    /// Reset play cursor, scan index, and active-note bitmap.
    pub reset_playback: bool,
    /// Active notes must be released before the change applies.
    pub flush_notes: bool,
}

/// Resolve a requested state change.
///
/// `has_loop_source` is true when a loop length is already defined or can
/// be derived from the configured beats; Play/Overdub without one falls
/// back to Stop.
pub fn resolve_transition(
    current: TrackState,
    requested: TrackState,
    has_loop_source: bool,
) -> Transition {
    let flush_notes = current.is_playing();
    match requested {
        TrackState::Rec => Transition {
            next: TrackState::Rec,
            clear_events: true,
            reset_playback: true,
            flush_notes,
            ..Default::default()
        },
        TrackState::Stop => Transition {
            next: TrackState::Stop,
            fix_loop_len: current == TrackState::Rec,
            reset_playback: true,
            flush_notes,
            ..Default::default()
        },
        TrackState::Play | TrackState::Overdub if !has_loop_source => Transition {
            next: TrackState::Stop,
            reset_playback: true,
            flush_notes,
            ..Default::default()
        },
        TrackState::Play => Transition {
            next: TrackState::Play,
            reset_playback: true,
            flush_notes,
            ..Default::default()
        },
        TrackState::Overdub => Transition {
            next: TrackState::Overdub,
            reset_playback: true,
            flush_notes,
            ..Default::default()
        },
    }
}

/// Per-channel bitmap of currently sounding notes (16 channels x 128 notes).
///
/// Written only by the playback engine as it emits note on/off; drained in
/// full at loop wrap or state change so no note is left hanging.
#[derive(Clone, Copy, Debug)]
pub struct ActiveNotes {
    bits: [u128; 16],
}

impl Default for ActiveNotes {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveNotes {
    pub const fn new() -> Self {
        Self { bits: [0; 16] }
    }

    pub fn set(&mut self, channel: u8, note: u8) {
        self.bits[(channel & 0x0F) as usize] |= 1u128 << (note & 0x7F);
    }

    pub fn clear(&mut self, channel: u8, note: u8) {
        self.bits[(channel & 0x0F) as usize] &= !(1u128 << (note & 0x7F));
    }

    pub fn contains(&self, channel: u8, note: u8) -> bool {
        self.bits[(channel & 0x0F) as usize] & (1u128 << (note & 0x7F)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    pub fn clear_all(&mut self) {
        self.bits = [0; 16];
    }

    /// Remove every set bit, yielding `(channel, note)` pairs in
    /// channel-then-note order.
    pub fn drain(&mut self, mut f: impl FnMut(u8, u8)) {
        for ch in 0..16u8 {
            let mut b = self.bits[ch as usize];
            while b != 0 {
                let note = b.trailing_zeros() as u8;
                f(ch, note);
                b &= b - 1;
            }
            self.bits[ch as usize] = 0;
        }
    }

    /// Track a message the engine just emitted.
    pub fn observe(&mut self, msg: &ShortMessage) {
        if msg.is_note_on() {
            if let Some(note) = msg.note() {
                self.set(msg.channel(), note);
            }
        } else if msg.is_note_off() {
            if let Some(note) = msg.note() {
                self.clear(msg.channel(), note);
            }
        }
    }
}

/// One looper track: state machine, cursors, event store, note bookkeeping.
#[derive(Clone, Debug)]
pub struct Track {
    pub state: TrackState,
    /// Loop length in ticks; 0 = undefined.
    pub loop_len_ticks: u32,
    /// Explicit loop length in beats; 0 = auto-detect from recording.
    pub loop_beats: u16,
    pub quantize: QuantizeGrid,
    pub mute: bool,
    /// Tick position while recording.
    pub write_tick: u32,
    /// Tick position while playing.
    pub play_tick: u32,
    /// Playback scan cursor into the sorted store.
    pub next_index: usize,
    pub store: EventStore,
    pub active: ActiveNotes,
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

impl Track {
    pub const fn new() -> Self {
        Self {
            state: TrackState::Stop,
            loop_len_ticks: 0,
            loop_beats: 0,
            quantize: QuantizeGrid::Off,
            mute: false,
            write_tick: 0,
            play_tick: 0,
            next_index: 0,
            store: EventStore::new(),
            active: ActiveNotes::new(),
        }
    }

    /// Wipe events, loop length, and cursors. `loop_beats`, quantize grid,
    /// and mute are configuration and survive.
    pub fn clear(&mut self) {
        self.store.clear();
        self.loop_len_ticks = 0;
        self.write_tick = 0;
        self.play_tick = 0;
        self.next_index = 0;
        self.active.clear_all();
    }

    /// True when a loop length is defined or derivable from `loop_beats`.
    pub fn has_loop_source(&self) -> bool {
        self.loop_len_ticks != 0 || self.loop_beats != 0
    }

    /// Make sure `loop_len_ticks` is set if it can be, returning it.
    ///
    /// A beats-derived length is never shorter than one beat.
    pub fn ensure_loop_len(&mut self) -> u32 {
        if self.loop_len_ticks == 0 && self.loop_beats != 0 {
            self.loop_len_ticks = beats_to_ticks(self.loop_beats).max(PPQN);
        }
        self.loop_len_ticks
    }

    /// Apply a resolved transition's side effects and switch state.
    ///
    /// Note flushing is the engine's job (it owns the output path); this
    /// only clears the bookkeeping.
    pub fn apply_transition(&mut self, t: Transition) {
        if t.clear_events {
            self.clear();
            self.ensure_loop_len();
        }
        if t.fix_loop_len && self.loop_len_ticks == 0 {
            // First recording defines the loop; never shorter than one beat.
            self.loop_len_ticks = self.write_tick.max(PPQN);
            self.store.rebase(self.loop_len_ticks);
        }
        if t.reset_playback {
            self.play_tick = 0;
            self.next_index = 0;
            self.active.clear_all();
        }
        if t.next.is_playing() {
            self.ensure_loop_len();
        }
        self.state = t.next;
    }

    /// Record an inbound message at the current cursor.
    ///
    /// Quantizes onto the track grid and reduces modulo the loop length
    /// when one is defined. No-op unless the track is in Rec/Overdub.
    pub fn record(&mut self, msg: ShortMessage) -> Result<(), StoreFull> {
        let raw_tick = match self.state {
            TrackState::Rec => self.write_tick,
            TrackState::Overdub => self.play_tick,
            _ => return Ok(()),
        };

        let mut tick = quantize(raw_tick, self.quantize.step_ticks());
        if self.loop_len_ticks != 0 {
            tick %= self.loop_len_ticks;
        }

        let pos = self.store.insert(LoopEvent::new(tick, msg))?;
        // An overdub landing behind the scan cursor belongs to this pass's
        // past; keep the cursor stable so nothing double-fires.
        if pos < self.next_index {
            self.next_index += 1;
        }
        Ok(())
    }
}
