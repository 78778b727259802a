//! Headless controller for the loopcore looper.
//!
//! Provides a unified API over the engine that a GUI, a CLI, or a device
//! bridge can share: a 1 ms clock thread, a lock around the engine, and
//! persistence that never does I/O while the tick path is blocked.

mod tap;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use lc_engine::{
    ClipSnapshot, EngineError, EventView, LoopEngine, MessageSink, SceneChain, MAX_TRACKS,
};
use lc_model::{QuantizeGrid, ShortMessage, TrackState, Transport};

// Re-export common types so callers don't need lc-model/lc-engine directly.
pub use lc_engine::SourceId;
pub use lc_formats::FormatError;

pub use tap::TapTempo;

/// Default capacity of the outbound message ring.
pub const DEFAULT_RING_CAPACITY: usize = 256;

/// A message leaving the looper, stamped with its humanize delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub msg: ShortMessage,
    pub delay_ms: u16,
}

/// Engine sink that pushes into the outbound ring.
///
/// Non-blocking: a full ring drops the message rather than stalling the
/// tick thread.
pub struct RingSink {
    producer: ringbuf::HeapProd<OutboundMessage>,
}

impl MessageSink for RingSink {
    fn send(&mut self, msg: ShortMessage, delay_ms: u16) {
        use ringbuf::traits::Producer;
        let _ = self.producer.try_push(OutboundMessage { msg, delay_ms });
    }
}

/// Error type for controller operations.
#[derive(Debug)]
pub enum ControlError {
    /// Engine rejected the request (bad track/scene/event index, full store)
    Engine(EngineError),
    /// Clip (de)serialization failed
    Format(FormatError),
    /// Filesystem error
    Io(std::io::Error),
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::Engine(e) => write!(f, "Engine error: {:?}", e),
            ControlError::Format(e) => write!(f, "Format error: {:?}", e),
            ControlError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ControlError {}

impl From<EngineError> for ControlError {
    fn from(e: EngineError) -> Self {
        ControlError::Engine(e)
    }
}

impl From<FormatError> for ControlError {
    fn from(e: FormatError) -> Self {
        ControlError::Format(e)
    }
}

impl From<std::io::Error> for ControlError {
    fn from(e: std::io::Error) -> Self {
        ControlError::Io(e)
    }
}

/// Headless looper controller — owns the engine and manages the clock.
pub struct Controller {
    engine: Arc<Mutex<LoopEngine<RingSink>>>,
    tap: TapTempo,
    clock: Option<ClockHandle>,
}

struct ClockHandle {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    /// Build a controller and the consumer end of its outbound ring.
    pub fn new() -> (Self, ringbuf::HeapCons<OutboundMessage>) {
        Self::with_ring_capacity(DEFAULT_RING_CAPACITY)
    }

    pub fn with_ring_capacity(capacity: usize) -> (Self, ringbuf::HeapCons<OutboundMessage>) {
        use ringbuf::traits::Split;
        let rb = ringbuf::HeapRb::<OutboundMessage>::new(capacity);
        let (producer, consumer) = rb.split();
        let controller = Self {
            engine: Arc::new(Mutex::new(LoopEngine::new(RingSink { producer }))),
            tap: TapTempo::new(),
            clock: None,
        };
        (controller, consumer)
    }

    fn engine(&self) -> MutexGuard<'_, LoopEngine<RingSink>> {
        // A panic on the tick thread poisons the lock; the state itself
        // is still consistent between ticks, so keep going.
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- Clock thread ---

    /// Start the 1 ms clock thread. Idempotent.
    pub fn start(&mut self) {
        if self.clock.is_some() {
            return;
        }
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = stop_signal.clone();
        let engine = self.engine.clone();

        let thread = std::thread::spawn(move || {
            clock_thread(engine, stop);
        });

        self.clock = Some(ClockHandle { stop_signal, thread: Some(thread) });
    }

    /// Stop the clock thread and wait for it to exit.
    pub fn stop(&mut self) {
        if let Some(mut clock) = self.clock.take() {
            clock.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = clock.thread.take() {
                let _ = handle.join();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_some()
    }

    /// Drive the clock by hand; only sensible while the thread is stopped.
    pub fn tick_1ms(&mut self) {
        self.engine().tick_1ms();
    }

    // --- Transport ---

    pub fn transport(&self) -> Transport {
        self.engine().transport()
    }

    pub fn set_transport(&mut self, transport: Transport) {
        self.engine().set_transport(transport);
    }

    pub fn set_tempo(&mut self, bpm: u16) {
        self.engine().set_tempo(bpm);
    }

    /// Register a tempo tap; applies the estimate once one exists.
    pub fn tap_tempo(&mut self) -> Option<u16> {
        let bpm = self.tap.tap()?;
        self.engine().set_tempo(bpm);
        Some(bpm)
    }

    // --- Track control ---

    pub fn set_state(&mut self, track: usize, state: TrackState) -> Result<(), ControlError> {
        Ok(self.engine().set_state(track, state)?)
    }

    pub fn state(&self, track: usize) -> Result<TrackState, ControlError> {
        Ok(self.engine().state(track)?)
    }

    pub fn clear(&mut self, track: usize) -> Result<(), ControlError> {
        Ok(self.engine().clear(track)?)
    }

    pub fn set_loop_beats(&mut self, track: usize, beats: u16) -> Result<(), ControlError> {
        Ok(self.engine().set_loop_beats(track, beats)?)
    }

    pub fn set_quantize(&mut self, track: usize, grid: QuantizeGrid) -> Result<(), ControlError> {
        Ok(self.engine().set_quantize(track, grid)?)
    }

    pub fn set_mute(&mut self, track: usize, mute: bool) -> Result<(), ControlError> {
        Ok(self.engine().set_mute(track, mute)?)
    }

    /// Solo a track (exclusive) or drop its solo.
    pub fn set_solo(&mut self, track: usize, solo: bool) -> Result<(), ControlError> {
        Ok(self.engine().set_solo(track, solo)?)
    }

    pub fn soloed(&self) -> Option<usize> {
        self.engine().soloed()
    }

    pub fn clear_solo(&mut self) {
        self.engine().clear_solo();
    }

    // --- Inbound messages ---

    pub fn handle_message(&mut self, source: SourceId, msg: ShortMessage) {
        self.engine().handle_message(source, msg);
    }

    pub fn handle_raw(&mut self, source: SourceId, len: u8, b0: u8, b1: u8, b2: u8) {
        self.engine().handle_raw(source, len, b0, b1, b2);
    }

    // --- Event editing ---

    pub fn export_events(&self, track: usize) -> Result<Vec<EventView>, ControlError> {
        Ok(self.engine().export_events(track)?)
    }

    pub fn add_event(
        &mut self,
        track: usize,
        tick: u32,
        msg: ShortMessage,
    ) -> Result<(), ControlError> {
        Ok(self.engine().add_event(track, tick, msg)?)
    }

    pub fn edit_event(
        &mut self,
        track: usize,
        index: usize,
        tick: u32,
        msg: ShortMessage,
    ) -> Result<(), ControlError> {
        Ok(self.engine().edit_event(track, index, tick, msg)?)
    }

    pub fn delete_event(&mut self, track: usize, index: usize) -> Result<(), ControlError> {
        Ok(self.engine().delete_event(track, index)?)
    }

    // --- Scenes ---

    pub fn current_scene(&self) -> usize {
        self.engine().current_scene()
    }

    pub fn save_to_scene(&mut self, scene: usize, track: usize) -> Result<(), ControlError> {
        Ok(self.engine().save_to_scene(scene, track)?)
    }

    pub fn load_from_scene(&mut self, scene: usize, track: usize) -> Result<(), ControlError> {
        Ok(self.engine().load_from_scene(scene, track)?)
    }

    pub fn trigger_scene(&mut self, scene: usize) -> Result<(), ControlError> {
        Ok(self.engine().trigger_scene(scene)?)
    }

    pub fn scene_name(&self, scene: usize) -> String {
        self.engine().scenes().name(scene).to_owned()
    }

    pub fn set_scene_name(&mut self, scene: usize, name: &str) {
        self.engine().scenes_mut().set_name(scene, name);
    }

    pub fn set_scene_chain(&mut self, scene: usize, chain: SceneChain) -> Result<(), ControlError> {
        Ok(self.engine().set_scene_chain(scene, chain)?)
    }

    // --- Persistence ---

    /// Save a track's clip to disk.
    ///
    /// The snapshot is taken under the lock; serialization and the write
    /// happen after it is released so the tick thread never waits on I/O.
    pub fn save_clip(&self, track: usize, path: &Path) -> Result<(), ControlError> {
        let (clip, transport) = {
            let engine = self.engine();
            (engine.snapshot(track)?, engine.transport())
        };
        let bytes = lc_formats::clip_to_bytes(&clip, &transport)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a clip from disk into a track.
    ///
    /// Reading and validation happen before the lock is taken; the track's
    /// previous contents survive any failure.
    pub fn load_clip(&mut self, track: usize, path: &Path) -> Result<(), ControlError> {
        let bytes = std::fs::read(path)?;
        let (clip, transport) = lc_formats::clip_from_bytes(&bytes)?;
        let mut engine = self.engine();
        engine.install(track, &clip)?;
        engine.set_transport(transport);
        Ok(())
    }

    /// Export one track as a type 0 Standard MIDI File.
    pub fn export_smf(&self, track: usize, path: &Path) -> Result<(), ControlError> {
        let (clip, transport) = {
            let engine = self.engine();
            (engine.snapshot(track)?, engine.transport())
        };
        let bytes = lc_formats::clip_to_smf(&clip, &transport);
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Export all non-empty tracks as a type 1 Standard MIDI File.
    pub fn export_smf_all(&self, path: &Path) -> Result<(), ControlError> {
        let (clips, transport) = {
            let engine = self.engine();
            let mut clips: Vec<(String, ClipSnapshot)> = Vec::new();
            for track in 0..MAX_TRACKS {
                let clip = engine.snapshot(track)?;
                if !clip.events.is_empty() {
                    clips.push((format!("track {}", track + 1), clip));
                }
            }
            (clips, engine.transport())
        };
        let named: Vec<(&str, &ClipSnapshot)> =
            clips.iter().map(|(name, clip)| (name.as_str(), clip)).collect();
        let bytes = lc_formats::clips_to_smf(&named, &transport);
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn clock_thread(engine: Arc<Mutex<LoopEngine<RingSink>>>, stop_signal: Arc<AtomicBool>) {
    while !stop_signal.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(1));
        let mut engine = engine.lock().unwrap_or_else(|e| e.into_inner());
        engine.tick_1ms();
    }
}
