//! The looper context: tick sweep, record gating, playback emission.

use alloc::vec::Vec;

use lc_model::{
    resolve_transition, LoopEvent, QuantizeGrid, ShortMessage, TickClock, Track, TrackState,
    Transport, MAX_EVENTS,
};

use crate::scene::{SceneBank, SceneChain, SceneSlot, MAX_SCENES};
use crate::sink::{Humanizer, MessageSink, NoHumanize};
use crate::MAX_TRACKS;

/// Identifies the node an inbound message arrived from.
pub type SourceId = u8;

/// Validation failures from control-plane calls. All leave state unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineError {
    InvalidTrack,
    InvalidScene,
    InvalidEvent,
    StoreFull,
}

/// One stored event as seen by external tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventView {
    /// Index into the sorted store (stable until the next mutation).
    pub index: usize,
    pub tick: u32,
    pub msg: ShortMessage,
}

/// A track's contents lifted out of the engine, for persistence and export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipSnapshot {
    pub loop_beats: u16,
    pub loop_len_ticks: u32,
    pub quantize: QuantizeGrid,
    pub mute: bool,
    pub events: Vec<LoopEvent>,
}

/// The multi-track looper.
///
/// One instance owns all track and transport state; every operation goes
/// through it by reference — there are no process-wide singletons. The
/// message sink and humanizer are injected at construction so the engine
/// is deterministic under test.
pub struct LoopEngine<S: MessageSink, H: Humanizer = NoHumanize> {
    transport: Transport,
    clock: TickClock,
    tracks: [Track; MAX_TRACKS],
    scenes: SceneBank,
    current_scene: u8,
    /// Exclusively soloed track, if any. While set, only this track emits.
    solo: Option<u8>,
    sink: S,
    humanizer: H,
}

impl<S: MessageSink> LoopEngine<S, NoHumanize> {
    pub fn new(sink: S) -> Self {
        Self::with_humanizer(sink, NoHumanize)
    }
}

impl<S: MessageSink, H: Humanizer> LoopEngine<S, H> {
    pub fn with_humanizer(sink: S, humanizer: H) -> Self {
        let transport = Transport::default();
        Self {
            transport,
            clock: TickClock::new(transport.bpm),
            tracks: core::array::from_fn(|_| Track::new()),
            scenes: SceneBank::new(),
            current_scene: 0,
            solo: None,
            sink,
            humanizer,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // --- Transport surface ---

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn set_transport(&mut self, transport: Transport) {
        self.transport = transport.sanitized();
        self.clock.set_bpm(self.transport.bpm);
    }

    pub fn set_tempo(&mut self, bpm: u16) {
        let mut t = self.transport;
        t.bpm = bpm;
        self.set_transport(t);
    }

    // --- Track surface ---

    pub fn track(&self, track: usize) -> Result<&Track, EngineError> {
        self.tracks.get(track).ok_or(EngineError::InvalidTrack)
    }

    fn track_mut(&mut self, track: usize) -> Result<&mut Track, EngineError> {
        self.tracks.get_mut(track).ok_or(EngineError::InvalidTrack)
    }

    pub fn state(&self, track: usize) -> Result<TrackState, EngineError> {
        Ok(self.track(track)?.state)
    }

    /// Request a state change; invalid Play/Overdub requests degrade to
    /// Stop rather than failing. Sounding notes are released first.
    pub fn set_state(&mut self, track: usize, requested: TrackState) -> Result<(), EngineError> {
        if track >= MAX_TRACKS {
            return Err(EngineError::InvalidTrack);
        }
        let Self { tracks, sink, humanizer, .. } = self;
        let t = &mut tracks[track];
        let transition = resolve_transition(t.state, requested, t.has_loop_source());
        if transition.flush_notes {
            flush_active(t, sink, humanizer);
        }
        t.apply_transition(transition);
        Ok(())
    }

    pub fn clear(&mut self, track: usize) -> Result<(), EngineError> {
        if track >= MAX_TRACKS {
            return Err(EngineError::InvalidTrack);
        }
        let Self { tracks, sink, humanizer, .. } = self;
        let t = &mut tracks[track];
        flush_active(t, sink, humanizer);
        t.clear();
        t.state = TrackState::Stop;
        Ok(())
    }

    pub fn set_loop_beats(&mut self, track: usize, beats: u16) -> Result<(), EngineError> {
        self.track_mut(track)?.loop_beats = beats;
        Ok(())
    }

    pub fn set_quantize(&mut self, track: usize, grid: QuantizeGrid) -> Result<(), EngineError> {
        self.track_mut(track)?.quantize = grid;
        Ok(())
    }

    pub fn set_mute(&mut self, track: usize, mute: bool) -> Result<(), EngineError> {
        self.track_mut(track)?.mute = mute;
        Ok(())
    }

    /// Solo a track, or drop its solo. Soloing is exclusive: at most one
    /// track is soloed, and soloing one un-soloes any other.
    pub fn set_solo(&mut self, track: usize, solo: bool) -> Result<(), EngineError> {
        if track >= MAX_TRACKS {
            return Err(EngineError::InvalidTrack);
        }
        if solo {
            self.solo = Some(track as u8);
        } else if self.solo == Some(track as u8) {
            self.solo = None;
        }
        Ok(())
    }

    pub fn soloed(&self) -> Option<usize> {
        self.solo.map(usize::from)
    }

    pub fn clear_solo(&mut self) {
        self.solo = None;
    }

    /// Whether the track would sound right now: soloed tracks always
    /// qualify, any other solo shadows it, otherwise the mute flag decides.
    pub fn is_audible(&self, track: usize) -> bool {
        let Some(t) = self.tracks.get(track) else { return false };
        match self.solo {
            Some(soloed) => soloed as usize == track,
            None => !t.mute,
        }
    }

    // --- Inbound messages ---

    /// Router callback: record a message into every armed track.
    ///
    /// A full store drops the insert silently — graceful degradation, not
    /// an error the performer can act on mid-take.
    pub fn handle_message(&mut self, _source: SourceId, msg: ShortMessage) {
        for t in self.tracks.iter_mut() {
            if t.state.is_recording() {
                let _ = t.record(msg);
            }
        }
    }

    /// Raw-byte variant of [`handle_message`](Self::handle_message);
    /// non-channel traffic is ignored.
    pub fn handle_raw(&mut self, source: SourceId, len: u8, b0: u8, b1: u8, b2: u8) {
        if let Some(msg) = ShortMessage::from_bytes(len, b0, b1, b2) {
            self.handle_message(source, msg);
        }
    }

    // --- Tick path ---

    /// The 1 ms tick: advance the clock and sweep all tracks.
    ///
    /// Bounded work: O(tracks) plus the events actually due this cycle.
    pub fn tick_1ms(&mut self) {
        let advance = self.clock.advance_1ms();
        if advance == 0 {
            return;
        }

        let auto_loop = self.transport.auto_loop;
        let solo = self.solo;
        let mut chained: Option<u8> = None;
        {
            let Self { tracks, sink, humanizer, scenes, current_scene, .. } = self;
            for (index, t) in tracks.iter_mut().enumerate() {
                let audible = match solo {
                    Some(soloed) => soloed as usize == index,
                    None => true,
                };
                if t.state == TrackState::Rec {
                    t.write_tick = t.write_tick.saturating_add(advance);
                    if auto_loop && t.loop_len_ticks != 0 && t.write_tick >= t.loop_len_ticks {
                        // Loop filled: hand off to playback without user action,
                        // keeping the known length rather than the write cursor.
                        let transition =
                            resolve_transition(TrackState::Rec, TrackState::Play, true);
                        t.apply_transition(transition);
                        t.write_tick = t.loop_len_ticks;
                    }
                }

                if !t.state.is_playing() || t.loop_len_ticks == 0 {
                    continue;
                }
                // One unit at a time so no event is skipped when advance > 1.
                for _ in 0..advance {
                    emit_due(t, audible, sink, humanizer);
                    t.play_tick += 1;
                    if t.play_tick >= t.loop_len_ticks {
                        flush_active(t, sink, humanizer);
                        t.play_tick = 0;
                        t.next_index = 0;
                        if index == 0 {
                            let chain = scenes.chain(*current_scene as usize);
                            if chain.enabled {
                                chained = chain.next_scene;
                            }
                        }
                    }
                }
            }
        }

        if let Some(scene) = chained {
            let _ = self.trigger_scene(scene as usize);
        }
    }

    // --- Scenes ---

    pub fn current_scene(&self) -> usize {
        self.current_scene as usize
    }

    pub fn set_current_scene(&mut self, scene: usize) -> Result<(), EngineError> {
        if scene >= MAX_SCENES {
            return Err(EngineError::InvalidScene);
        }
        self.current_scene = scene as u8;
        Ok(())
    }

    pub fn scenes(&self) -> &SceneBank {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneBank {
        &mut self.scenes
    }

    /// Snapshot a track's play metadata into a scene slot.
    pub fn save_to_scene(&mut self, scene: usize, track: usize) -> Result<(), EngineError> {
        if scene >= MAX_SCENES {
            return Err(EngineError::InvalidScene);
        }
        let t = self.track(track)?;
        let slot = SceneSlot {
            has_clip: !t.store.is_empty() || t.loop_beats != 0,
            loop_beats: t.loop_beats,
        };
        self.scenes.set_slot(scene, track, slot);
        Ok(())
    }

    /// Restore a track's loop-beats metadata from a scene slot.
    pub fn load_from_scene(&mut self, scene: usize, track: usize) -> Result<(), EngineError> {
        if scene >= MAX_SCENES {
            return Err(EngineError::InvalidScene);
        }
        if track >= MAX_TRACKS {
            return Err(EngineError::InvalidTrack);
        }
        let slot = self.scenes.slot(scene, track);
        if slot.has_clip && slot.loop_beats != 0 {
            self.tracks[track].loop_beats = slot.loop_beats;
        }
        Ok(())
    }

    /// Arrangement switch: tracks with a clip play, the rest stop.
    pub fn trigger_scene(&mut self, scene: usize) -> Result<(), EngineError> {
        if scene >= MAX_SCENES {
            return Err(EngineError::InvalidScene);
        }
        self.current_scene = scene as u8;
        for track in 0..MAX_TRACKS {
            let slot = self.scenes.slot(scene, track);
            if slot.has_clip {
                if slot.loop_beats != 0 {
                    self.tracks[track].loop_beats = slot.loop_beats;
                }
                self.set_state(track, TrackState::Play)?;
            } else {
                self.set_state(track, TrackState::Stop)?;
            }
        }
        Ok(())
    }

    pub fn set_scene_chain(&mut self, scene: usize, chain: SceneChain) -> Result<(), EngineError> {
        if scene >= MAX_SCENES {
            return Err(EngineError::InvalidScene);
        }
        self.scenes.set_chain(scene, chain);
        Ok(())
    }

    // --- Debug / persistence surface ---

    /// Copy out a track's events for external tooling.
    pub fn export_events(&self, track: usize) -> Result<Vec<EventView>, EngineError> {
        let t = self.track(track)?;
        Ok(t.store
            .events()
            .iter()
            .enumerate()
            .map(|(index, e)| EventView { index, tick: e.tick, msg: e.msg })
            .collect())
    }

    /// Insert a single event by hand (editor/CLI path).
    pub fn add_event(
        &mut self,
        track: usize,
        tick: u32,
        msg: ShortMessage,
    ) -> Result<(), EngineError> {
        let t = self.track_mut(track)?;
        let tick = if t.loop_len_ticks != 0 { tick % t.loop_len_ticks } else { tick };
        t.store
            .insert(LoopEvent::new(tick, msg))
            .map(|_| ())
            .map_err(|_| EngineError::StoreFull)
    }

    /// Rewrite the event at `index` (tick and bytes).
    pub fn edit_event(
        &mut self,
        track: usize,
        index: usize,
        tick: u32,
        msg: ShortMessage,
    ) -> Result<(), EngineError> {
        let t = self.track_mut(track)?;
        let tick = if t.loop_len_ticks != 0 { tick % t.loop_len_ticks } else { tick };
        t.store
            .replace(index, LoopEvent::new(tick, msg))
            .map(|_| ())
            .ok_or(EngineError::InvalidEvent)
    }

    pub fn delete_event(&mut self, track: usize, index: usize) -> Result<(), EngineError> {
        let t = self.track_mut(track)?;
        t.store.remove(index).ok_or(EngineError::InvalidEvent)?;
        // Mirror of the bump in Track::record: a removal behind the scan
        // cursor shifts the remaining due events down by one.
        if index < t.next_index {
            t.next_index -= 1;
        }
        Ok(())
    }

    /// Lift a track's contents out for persistence. Cheap relative to the
    /// store size; callers run it under the engine lock, I/O happens after.
    pub fn snapshot(&self, track: usize) -> Result<ClipSnapshot, EngineError> {
        let t = self.track(track)?;
        Ok(ClipSnapshot {
            loop_beats: t.loop_beats,
            loop_len_ticks: t.loop_len_ticks,
            quantize: t.quantize,
            mute: t.mute,
            events: t.store.events().to_vec(),
        })
    }

    /// Replace a track's contents from an already-validated snapshot.
    ///
    /// The track lands in Stop with cursors reset; the previous contents
    /// are only discarded here, after validation succeeded upstream.
    pub fn install(&mut self, track: usize, clip: &ClipSnapshot) -> Result<(), EngineError> {
        if clip.events.len() > MAX_EVENTS {
            return Err(EngineError::StoreFull);
        }
        if track >= MAX_TRACKS {
            return Err(EngineError::InvalidTrack);
        }
        {
            let Self { tracks, sink, humanizer, .. } = self;
            flush_active(&mut tracks[track], sink, humanizer);
        }
        let t = &mut self.tracks[track];
        t.clear();
        t.loop_beats = clip.loop_beats;
        t.loop_len_ticks = clip.loop_len_ticks;
        t.quantize = clip.quantize;
        t.mute = clip.mute;
        for ev in &clip.events {
            // Sorted insertion also repairs unordered input.
            t.store.insert(*ev).map_err(|_| EngineError::StoreFull)?;
        }
        t.state = TrackState::Stop;
        Ok(())
    }
}

/// Send one message with the humanizer's jitter applied.
fn emit<S: MessageSink, H: Humanizer>(sink: &mut S, humanizer: &mut H, msg: ShortMessage) {
    let jitter = humanizer.jitter_ms();
    let delay = if jitter < 0 { 0 } else { jitter as u16 };
    sink.send(msg, delay);
}

/// Release every sounding note and clear the bitmap.
fn flush_active<S: MessageSink, H: Humanizer>(track: &mut Track, sink: &mut S, humanizer: &mut H) {
    track
        .active
        .drain(|ch, note| emit(sink, humanizer, ShortMessage::note_off(ch, note)));
}

/// Emit events due at the current play cursor, advancing the scan index.
///
/// `audible` carries the solo verdict; the mute flag is the track's own.
/// Stale entries (an overdub insert landing behind the cursor mid-pass)
/// are skipped without emitting; they play on the next pass.
fn emit_due<S: MessageSink, H: Humanizer>(
    track: &mut Track,
    audible: bool,
    sink: &mut S,
    humanizer: &mut H,
) {
    while track.next_index < track.store.len() {
        let ev = match track.store.get(track.next_index) {
            Some(e) => *e,
            None => break,
        };
        if ev.tick > track.play_tick {
            break;
        }
        if ev.tick == track.play_tick && audible && !track.mute {
            emit(sink, humanizer, ev.msg);
            track.active.observe(&ev.msg);
        }
        track.next_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// Captures emissions for inspection.
    #[derive(Default)]
    struct Capture {
        sent: Vec<(ShortMessage, u16)>,
    }

    impl MessageSink for Capture {
        fn send(&mut self, msg: ShortMessage, delay_ms: u16) {
            self.sent.push((msg, delay_ms));
        }
    }

    fn note_on(note: u8, vel: u8) -> ShortMessage {
        ShortMessage::ThreeByte { status: 0x90, data1: note, data2: vel }
    }

    fn engine() -> LoopEngine<Capture> {
        LoopEngine::new(Capture::default())
    }

    /// Run `ms` milliseconds of tick callbacks.
    fn run_ms(e: &mut LoopEngine<Capture>, ms: u32) {
        for _ in 0..ms {
            e.tick_1ms();
        }
    }

    #[test]
    fn records_only_into_armed_tracks() {
        let mut e = engine();
        e.set_state(0, TrackState::Rec).unwrap();
        e.handle_message(0, note_on(60, 100));
        assert_eq!(e.track(0).unwrap().store.len(), 1);
        assert_eq!(e.track(1).unwrap().store.len(), 0);
    }

    #[test]
    fn handle_raw_ignores_system_bytes() {
        let mut e = engine();
        e.set_state(0, TrackState::Rec).unwrap();
        e.handle_raw(0, 3, 0x45, 60, 100); // data byte in status position
        e.handle_raw(0, 1, 0xF8, 0, 0); // wrong length
        assert!(e.track(0).unwrap().store.is_empty());
    }

    #[test]
    fn playback_emits_recorded_events_in_order() {
        let mut e = engine();
        e.set_loop_beats(0, 1).unwrap(); // 96-tick loop
        e.set_state(0, TrackState::Rec).unwrap();
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.add_event(0, 48, note_on(64, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();
        e.set_state(0, TrackState::Play).unwrap();

        // 96 ticks at 120 bpm = 500 ms
        run_ms(&mut e, 500);
        let sent: Vec<_> = e.sink().sent.iter().map(|(m, _)| *m).collect();
        // two note-ons plus the wrap flush note-offs
        assert_eq!(sent[0], note_on(60, 100));
        assert_eq!(sent[1], note_on(64, 100));
        assert!(sent[2..].iter().all(|m| m.is_note_off()));
    }

    #[test]
    fn wrap_releases_each_active_note_exactly_once() {
        let mut e = engine();
        e.set_loop_beats(0, 1).unwrap();
        e.set_state(0, TrackState::Rec).unwrap();
        // note-ons with no matching offs
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.add_event(0, 24, note_on(64, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();
        e.set_state(0, TrackState::Play).unwrap();

        run_ms(&mut e, 500); // one full loop
        let offs: Vec<_> = e
            .sink()
            .sent
            .iter()
            .filter(|(m, _)| m.is_note_off())
            .map(|(m, _)| m.note().unwrap())
            .collect();
        assert_eq!(offs.len(), 2);
        assert!(offs.contains(&60) && offs.contains(&64));
        assert!(e.track(0).unwrap().active.is_empty());
    }

    #[test]
    fn mute_suppresses_emission_but_cursor_advances() {
        let mut e = engine();
        e.set_loop_beats(0, 1).unwrap();
        e.set_state(0, TrackState::Rec).unwrap();
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();
        e.set_mute(0, true).unwrap();
        e.set_state(0, TrackState::Play).unwrap();

        run_ms(&mut e, 500);
        assert!(e.sink().sent.is_empty());
        assert!(e.track(0).unwrap().active.is_empty());
    }

    #[test]
    fn auto_loop_flips_rec_to_play_at_known_length() {
        let mut e = engine();
        e.set_loop_beats(0, 1).unwrap(); // known 96-tick loop
        e.set_state(0, TrackState::Rec).unwrap();
        assert_eq!(e.state(0).unwrap(), TrackState::Rec);

        run_ms(&mut e, 500); // 96 ticks
        assert_eq!(e.state(0).unwrap(), TrackState::Play);
        assert_eq!(e.track(0).unwrap().loop_len_ticks, 96);
    }

    #[test]
    fn stopping_playback_releases_sounding_notes() {
        let mut e = engine();
        e.set_loop_beats(0, 1).unwrap();
        e.set_state(0, TrackState::Rec).unwrap();
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();
        e.set_state(0, TrackState::Play).unwrap();

        run_ms(&mut e, 100); // mid-loop, note sounding
        e.set_state(0, TrackState::Stop).unwrap();
        let last = e.sink().sent.last().unwrap().0;
        assert!(last.is_note_off());
        assert_eq!(last.note(), Some(60));
    }

    #[test]
    fn trigger_scene_plays_and_stops_tracks() {
        let mut e = engine();
        e.set_loop_beats(0, 2).unwrap();
        e.set_state(0, TrackState::Rec).unwrap();
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();
        e.save_to_scene(3, 0).unwrap();
        // track 1 never recorded; slot stays empty
        e.save_to_scene(3, 1).unwrap();

        e.set_state(1, TrackState::Rec).unwrap();
        e.trigger_scene(3).unwrap();
        assert_eq!(e.state(0).unwrap(), TrackState::Play);
        assert_eq!(e.state(1).unwrap(), TrackState::Stop);
        assert_eq!(e.current_scene(), 3);
    }

    #[test]
    fn scene_chain_fires_when_track_zero_wraps() {
        let mut e = engine();
        e.set_loop_beats(0, 1).unwrap();
        e.set_state(0, TrackState::Rec).unwrap();
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();

        e.save_to_scene(0, 0).unwrap();
        e.save_to_scene(1, 0).unwrap();
        e.set_scene_chain(0, SceneChain { next_scene: Some(1), enabled: true })
            .unwrap();

        e.trigger_scene(0).unwrap();
        run_ms(&mut e, 500); // one loop
        assert_eq!(e.current_scene(), 1);
    }

    #[test]
    fn snapshot_install_round_trip() {
        let mut e = engine();
        e.set_loop_beats(0, 1).unwrap();
        e.set_quantize(0, QuantizeGrid::Eighth).unwrap();
        e.set_state(0, TrackState::Rec).unwrap();
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.add_event(0, 48, note_on(64, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();

        let snap = e.snapshot(0).unwrap();
        e.clear(0).unwrap();
        assert!(e.track(0).unwrap().store.is_empty());

        e.install(0, &snap).unwrap();
        let t = e.track(0).unwrap();
        assert_eq!(t.loop_len_ticks, 96);
        assert_eq!(t.quantize, QuantizeGrid::Eighth);
        assert_eq!(t.store.len(), 2);
        assert_eq!(t.state, TrackState::Stop);
    }

    fn playing_track(e: &mut LoopEngine<Capture>, track: usize, key: u8) {
        e.set_loop_beats(track, 1).unwrap();
        e.set_state(track, TrackState::Rec).unwrap();
        e.add_event(track, 0, note_on(key, 100)).unwrap();
        e.add_event(track, 12, ShortMessage::note_off(0, key)).unwrap();
        e.set_state(track, TrackState::Stop).unwrap();
        e.set_state(track, TrackState::Play).unwrap();
    }

    #[test]
    fn solo_is_exclusive_and_gates_other_tracks() {
        let mut e = engine();
        playing_track(&mut e, 0, 60);
        playing_track(&mut e, 1, 61);

        e.set_solo(0, true).unwrap();
        assert_eq!(e.soloed(), Some(0));
        assert!(e.is_audible(0));
        assert!(!e.is_audible(1));
        run_ms(&mut e, 500); // one pass: only track 0 sounds

        e.set_solo(1, true).unwrap(); // moves the solo, does not stack
        assert_eq!(e.soloed(), Some(1));
        run_ms(&mut e, 500);

        e.set_solo(1, false).unwrap();
        assert_eq!(e.soloed(), None);
        run_ms(&mut e, 500); // both audible again

        let ons: Vec<u8> = e
            .sink()
            .sent
            .iter()
            .filter(|(m, _)| m.is_note_on())
            .filter_map(|(m, _)| m.note())
            .collect();
        assert_eq!(ons, [60, 61, 60, 61]);
    }

    #[test]
    fn muted_solo_track_stays_silent() {
        let mut e = engine();
        playing_track(&mut e, 0, 60);
        playing_track(&mut e, 1, 61);
        e.set_solo(0, true).unwrap();
        e.set_mute(0, true).unwrap();

        run_ms(&mut e, 500);
        assert!(e.sink().sent.is_empty());
    }

    #[test]
    fn soloing_away_a_sounding_track_releases_it_at_wrap() {
        let mut e = engine();
        playing_track(&mut e, 0, 60);
        // track 1 holds its note across the whole loop
        e.set_loop_beats(1, 1).unwrap();
        e.set_state(1, TrackState::Rec).unwrap();
        e.add_event(1, 0, note_on(61, 100)).unwrap();
        e.set_state(1, TrackState::Stop).unwrap();
        e.set_state(1, TrackState::Play).unwrap();

        run_ms(&mut e, 100); // both note-ons fired, 61 still sounding
        e.set_solo(0, true).unwrap();
        run_ms(&mut e, 900); // crosses the wrap and most of the next pass

        let note_61 = |pred: fn(&ShortMessage) -> bool| {
            e.sink()
                .sent
                .iter()
                .filter(|(m, _)| pred(m) && m.note() == Some(61))
                .count()
        };
        // released exactly once at the wrap, never re-struck while shadowed
        assert_eq!(note_61(ShortMessage::is_note_off), 1);
        assert_eq!(note_61(ShortMessage::is_note_on), 1);
        assert!(e.track(1).unwrap().active.is_empty());
    }

    #[test]
    fn deleting_behind_the_scan_cursor_keeps_later_events_due() {
        let mut e = engine();
        e.set_loop_beats(0, 1).unwrap();
        e.set_state(0, TrackState::Rec).unwrap();
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.add_event(0, 48, note_on(64, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();
        e.set_state(0, TrackState::Play).unwrap();

        run_ms(&mut e, 100); // past tick 0, before tick 48
        e.delete_event(0, 0).unwrap();
        assert_eq!(e.track(0).unwrap().next_index, 0);

        run_ms(&mut e, 200); // reaches tick 48 within the same pass
        let ons: Vec<u8> = e
            .sink()
            .sent
            .iter()
            .filter(|(m, _)| m.is_note_on())
            .filter_map(|(m, _)| m.note())
            .collect();
        assert_eq!(ons, [60, 64]);
    }

    #[test]
    fn invalid_track_is_rejected() {
        let mut e = engine();
        assert_eq!(e.set_state(MAX_TRACKS, TrackState::Play), Err(EngineError::InvalidTrack));
        assert_eq!(e.export_events(MAX_TRACKS), Err(EngineError::InvalidTrack));
    }

    #[test]
    fn edit_and_delete_keep_store_ordered() {
        let mut e = engine();
        e.set_loop_beats(0, 4).unwrap();
        e.set_state(0, TrackState::Rec).unwrap();
        e.add_event(0, 0, note_on(60, 100)).unwrap();
        e.add_event(0, 96, note_on(64, 100)).unwrap();
        e.add_event(0, 192, note_on(67, 100)).unwrap();
        e.set_state(0, TrackState::Stop).unwrap();

        e.edit_event(0, 0, 300, note_on(60, 100)).unwrap();
        let views = e.export_events(0).unwrap();
        let ticks: Vec<u32> = views.iter().map(|v| v.tick).collect();
        assert_eq!(ticks, [96, 192, 300]);

        e.delete_event(0, 1).unwrap();
        let views = e.export_events(0).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(e.delete_event(0, 5), Err(EngineError::InvalidEvent));
    }
}
