//! Native clip format: a fixed little-endian header plus 8-byte event
//! records.
//!
//! The layout matches what the controller firmware flashes to storage, so
//! clips move between desktop and device without conversion. All
//! validation happens here; the caller only installs clips that parsed
//! cleanly.

use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};
use lc_engine::ClipSnapshot;
use lc_model::{LoopEvent, QuantizeGrid, ShortMessage, Transport, MAX_EVENTS, PPQN};

use crate::FormatError;

/// `"LOOP"` read as a little-endian u32.
pub const CLIP_MAGIC: u32 = 0x4C4F_4F50;
/// Current format version.
pub const CLIP_VERSION: u16 = 1;

#[binrw]
#[brw(little, magic = 0x4C4F_4F50u32)]
struct ClipHeader {
    version: u16,
    ppqn: u16,
    bpm: u16,
    loop_beats: u16,
    loop_len_ticks: u32,
    count: u32,
    quantize: u8,
    mute: u8,
    ts_num: u8,
    ts_den: u8,
}

/// One stored event: tick, wire length, raw message bytes.
#[binrw]
#[brw(little)]
struct ClipRecord {
    tick: u32,
    len: u8,
    b0: u8,
    b1: u8,
    b2: u8,
}

/// Serialize a clip and the transport settings it was captured under.
pub fn clip_to_bytes(clip: &ClipSnapshot, transport: &Transport) -> Result<Vec<u8>, FormatError> {
    if clip.events.len() > MAX_EVENTS {
        return Err(FormatError::TooManyEvents);
    }

    let header = ClipHeader {
        version: CLIP_VERSION,
        ppqn: PPQN as u16,
        bpm: transport.bpm,
        loop_beats: clip.loop_beats,
        loop_len_ticks: clip.loop_len_ticks,
        count: clip.events.len() as u32,
        quantize: clip.quantize.to_raw(),
        mute: clip.mute as u8,
        ts_num: transport.ts_num,
        ts_den: transport.ts_den,
    };

    let mut cursor = Cursor::new(Vec::new());
    header.write(&mut cursor)?;
    for ev in &clip.events {
        let (b0, b1, b2) = ev.msg.bytes();
        let record = ClipRecord { tick: ev.tick, len: ev.msg.len(), b0, b1, b2 };
        record.write(&mut cursor)?;
    }
    Ok(cursor.into_inner())
}

/// Parse and fully validate a clip.
///
/// Nothing is returned unless every header field and every event record
/// checks out, so a caller can discard live state only after success.
pub fn clip_from_bytes(data: &[u8]) -> Result<(ClipSnapshot, Transport), FormatError> {
    let mut cursor = Cursor::new(data);
    let header = ClipHeader::read(&mut cursor)?;

    if header.version != CLIP_VERSION {
        return Err(FormatError::UnsupportedVersion);
    }
    if header.ppqn as u32 != PPQN {
        return Err(FormatError::UnsupportedVersion);
    }
    if header.count as usize > MAX_EVENTS {
        return Err(FormatError::TooManyEvents);
    }
    let quantize = QuantizeGrid::from_raw(header.quantize).ok_or(FormatError::InvalidHeader)?;

    let mut events = Vec::with_capacity(header.count as usize);
    for _ in 0..header.count {
        let record = ClipRecord::read(&mut cursor)?;
        let msg = ShortMessage::from_bytes(record.len, record.b0, record.b1, record.b2)
            .ok_or(FormatError::InvalidEvent)?;
        events.push(LoopEvent::new(record.tick, msg));
    }

    let clip = ClipSnapshot {
        loop_beats: header.loop_beats,
        loop_len_ticks: header.loop_len_ticks,
        quantize,
        mute: header.mute != 0,
        events,
    };
    let transport = Transport {
        bpm: header.bpm,
        ts_num: header.ts_num,
        ts_den: header.ts_den,
        ..Transport::default()
    };
    Ok((clip, transport))
}
