//! Integration tests: clip save/load through the controller, with real
//! files on disk.

use std::fs;
use std::path::PathBuf;

use lc_master::{ControlError, Controller, FormatError};
use lc_model::{QuantizeGrid, ShortMessage, TrackState};

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("loopcore-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn note_on(note: u8) -> ShortMessage {
    ShortMessage::ThreeByte { status: 0x90, data1: note, data2: 100 }
}

fn note_off(note: u8) -> ShortMessage {
    ShortMessage::ThreeByte { status: 0x80, data1: note, data2: 0 }
}

/// A controller with a one-bar figure on track 1.
fn recorded_controller() -> Controller {
    let (mut ctrl, _outbound) = Controller::new();
    ctrl.set_tempo(97);
    ctrl.set_loop_beats(0, 4).unwrap();
    ctrl.set_quantize(0, QuantizeGrid::Sixteenth).unwrap();
    ctrl.set_state(0, TrackState::Rec).unwrap();
    for (tick, key) in [(0u32, 60u8), (96, 64), (192, 67), (288, 72)] {
        ctrl.add_event(0, tick, note_on(key)).unwrap();
        ctrl.add_event(0, tick + 48, note_off(key)).unwrap();
    }
    ctrl.set_state(0, TrackState::Stop).unwrap();
    ctrl
}

#[test]
fn save_load_restores_the_clip_exactly() {
    let path = temp_path("roundtrip.loop");
    let ctrl = recorded_controller();
    let before = ctrl.export_events(0).unwrap();
    ctrl.save_clip(0, &path).unwrap();

    let (mut other, _outbound) = Controller::new();
    other.load_clip(1, &path).unwrap();

    assert_eq!(other.export_events(1).unwrap(), before);
    assert_eq!(other.state(1).unwrap(), TrackState::Stop);
    assert_eq!(other.transport().bpm, 97);

    // Re-saving produces identical bytes.
    let copy = temp_path("roundtrip-copy.loop");
    other.save_clip(1, &copy).unwrap();
    assert_eq!(fs::read(&path).unwrap(), fs::read(&copy).unwrap());
}

#[test]
fn corrupt_magic_leaves_the_track_untouched() {
    let path = temp_path("corrupt.loop");
    let ctrl = recorded_controller();
    ctrl.save_clip(0, &path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[0] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    let mut victim = recorded_controller();
    let before = victim.export_events(0).unwrap();
    let err = victim.load_clip(0, &path).unwrap_err();
    assert!(matches!(err, ControlError::Format(FormatError::InvalidHeader)));
    assert_eq!(victim.export_events(0).unwrap(), before);
}

#[test]
fn truncated_clip_is_rejected() {
    let path = temp_path("truncated.loop");
    let ctrl = recorded_controller();
    ctrl.save_clip(0, &path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let (mut other, _outbound) = Controller::new();
    let err = other.load_clip(0, &path).unwrap_err();
    assert!(matches!(err, ControlError::Format(FormatError::UnexpectedEof)));
    assert!(other.export_events(0).unwrap().is_empty());
}

#[test]
fn loaded_clip_plays_back() {
    let path = temp_path("playback.loop");
    recorded_controller().save_clip(0, &path).unwrap();

    let (mut ctrl, mut outbound) = Controller::new();
    ctrl.load_clip(0, &path).unwrap();
    ctrl.set_state(0, TrackState::Play).unwrap();
    for _ in 0..200 {
        ctrl.tick_1ms();
    }
    use ringbuf::traits::Consumer;
    let first = outbound.try_pop().expect("loaded clip should emit");
    assert_eq!(first.msg, note_on(60));
}

#[test]
fn smf_export_writes_a_readable_header() {
    let path = temp_path("export.mid");
    let ctrl = recorded_controller();
    ctrl.export_smf(0, &path).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"MThd");
    assert_eq!(&bytes[14..18], b"MTrk");
    // file ends with the end-of-track meta event
    assert_eq!(&bytes[bytes.len() - 3..], &[0xFF, 0x2F, 0x00]);

    let all = temp_path("export-all.mid");
    ctrl.export_smf_all(&all).unwrap();
    let bytes = fs::read(&all).unwrap();
    assert_eq!(&bytes[8..10], &[0x00, 0x01]); // format 1
    assert_eq!(&bytes[10..12], &[0x00, 0x02]); // conductor + one track
}
