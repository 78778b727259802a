//! Standard MIDI File export.
//!
//! Clips leave the looper as type 0 (single clip) or type 1 (one track
//! per clip plus a tempo track) files at the looper's native tick
//! resolution, so a DAW reads them back at the exact recorded positions.

use std::io::Write;

use lc_engine::ClipSnapshot;
use lc_model::{LoopEvent, Transport, PPQN};

/// Export a single clip as an SMF type 0 file.
pub fn clip_to_smf(clip: &ClipSnapshot, transport: &Transport) -> Vec<u8> {
    let mut buf = Vec::new();
    write_smf_header(&mut buf, 0, 1).expect("Vec<u8> write cannot fail");

    let mut track = Vec::new();
    push_tempo(&mut track, transport.bpm);
    push_time_signature(&mut track, transport.ts_num, transport.ts_den);
    push_events(&mut track, clip);
    write_chunk(&mut buf, b"MTrk", &track).expect("Vec<u8> write cannot fail");
    buf
}

/// Export several named clips as an SMF type 1 file.
///
/// Track 0 carries tempo and time signature; each clip follows as its own
/// named track.
pub fn clips_to_smf(clips: &[(&str, &ClipSnapshot)], transport: &Transport) -> Vec<u8> {
    let mut buf = Vec::new();
    write_smf_header(&mut buf, 1, clips.len() as u16 + 1).expect("Vec<u8> write cannot fail");

    let mut conductor = Vec::new();
    push_tempo(&mut conductor, transport.bpm);
    push_time_signature(&mut conductor, transport.ts_num, transport.ts_den);
    push_end_of_track(&mut conductor, 0);
    write_chunk(&mut buf, b"MTrk", &conductor).expect("Vec<u8> write cannot fail");

    for (name, clip) in clips {
        let mut track = Vec::new();
        push_track_name(&mut track, name);
        push_events(&mut track, clip);
        write_chunk(&mut buf, b"MTrk", &track).expect("Vec<u8> write cannot fail");
    }
    buf
}

fn write_smf_header(w: &mut impl Write, format: u16, ntracks: u16) -> std::io::Result<()> {
    w.write_all(b"MThd")?;
    w.write_all(&6u32.to_be_bytes())?;
    w.write_all(&format.to_be_bytes())?;
    w.write_all(&ntracks.to_be_bytes())?;
    w.write_all(&(PPQN as u16).to_be_bytes())
}

fn write_chunk(w: &mut impl Write, tag: &[u8; 4], body: &[u8]) -> std::io::Result<()> {
    w.write_all(tag)?;
    w.write_all(&(body.len() as u32).to_be_bytes())?;
    w.write_all(body)
}

/// Append a variable-length quantity (big-endian, 7 bits per byte).
fn push_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut stack = [0u8; 5];
    let mut n = 0;
    loop {
        stack[n] = (value & 0x7F) as u8;
        value >>= 7;
        n += 1;
        if value == 0 {
            break;
        }
    }
    while n > 1 {
        n -= 1;
        buf.push(stack[n] | 0x80);
    }
    buf.push(stack[0]);
}

fn push_tempo(buf: &mut Vec<u8>, bpm: u16) {
    let bpm = bpm.max(1) as u32;
    let usec_per_beat = 60_000_000 / bpm;
    push_vlq(buf, 0);
    buf.push(0xFF);
    buf.push(0x51);
    buf.push(0x03);
    buf.extend_from_slice(&usec_per_beat.to_be_bytes()[1..4]);
}

fn push_time_signature(buf: &mut Vec<u8>, num: u8, den: u8) {
    // Denominator is stored as a power of two; non-power values fall back
    // to 4 (exponent 2).
    let exponent = if den.is_power_of_two() { den.trailing_zeros() as u8 } else { 2 };
    push_vlq(buf, 0);
    buf.extend_from_slice(&[0xFF, 0x58, 0x04, num.max(1), exponent, 24, 8]);
}

fn push_track_name(buf: &mut Vec<u8>, name: &str) {
    let bytes = name.as_bytes();
    push_vlq(buf, 0);
    buf.push(0xFF);
    buf.push(0x03);
    push_vlq(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

fn push_end_of_track(buf: &mut Vec<u8>, delta: u32) {
    push_vlq(buf, delta);
    buf.extend_from_slice(&[0xFF, 0x2F, 0x00]);
}

/// Append a clip's events as delta-timed messages plus end-of-track.
fn push_events(buf: &mut Vec<u8>, clip: &ClipSnapshot) {
    let mut events: Vec<LoopEvent> = clip.events.clone();
    events.sort_by_key(|e| e.tick);

    let mut cursor = 0u32;
    for ev in &events {
        push_vlq(buf, ev.tick.saturating_sub(cursor));
        cursor = ev.tick;
        let (b0, b1, b2) = ev.msg.bytes();
        buf.push(b0);
        buf.push(b1);
        if ev.msg.len() == 3 {
            buf.push(b2);
        }
    }
    // Pad out to the loop boundary so the file length matches the loop.
    push_end_of_track(buf, clip.loop_len_ticks.saturating_sub(cursor));
}
