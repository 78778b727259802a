//! Short MIDI channel messages and timestamped loop events.

/// A 2- or 3-byte MIDI channel message.
///
/// Only channel messages with the status high bit set are representable;
/// system and SysEx traffic never enters the looper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortMessage {
    /// Two-byte message (program change, channel pressure).
    TwoByte { status: u8, data1: u8 },
    /// Three-byte message (note on/off, poly pressure, CC, pitch bend).
    ThreeByte { status: u8, data1: u8, data2: u8 },
}

impl ShortMessage {
    /// Build from raw bytes as they appear on the wire or on disk.
    ///
    /// Returns `None` for lengths other than 2/3 or a clear status high bit.
    pub fn from_bytes(len: u8, b0: u8, b1: u8, b2: u8) -> Option<Self> {
        if b0 & 0x80 == 0 {
            return None;
        }
        match len {
            2 => Some(Self::TwoByte { status: b0, data1: b1 }),
            3 => Some(Self::ThreeByte { status: b0, data1: b1, data2: b2 }),
            _ => None,
        }
    }

    /// A note-off for `note` on `channel`, velocity 0.
    pub const fn note_off(channel: u8, note: u8) -> Self {
        Self::ThreeByte { status: 0x80 | (channel & 0x0F), data1: note, data2: 0 }
    }

    pub const fn status(&self) -> u8 {
        match *self {
            Self::TwoByte { status, .. } | Self::ThreeByte { status, .. } => status,
        }
    }

    pub const fn channel(&self) -> u8 {
        self.status() & 0x0F
    }

    /// Message length on the wire (2 or 3).
    pub const fn len(&self) -> u8 {
        match self {
            Self::TwoByte { .. } => 2,
            Self::ThreeByte { .. } => 3,
        }
    }

    /// Raw bytes `(b0, b1, b2)`; `b2` is 0 for two-byte messages.
    pub const fn bytes(&self) -> (u8, u8, u8) {
        match *self {
            Self::TwoByte { status, data1 } => (status, data1, 0),
            Self::ThreeByte { status, data1, data2 } => (status, data1, data2),
        }
    }

    /// True for a note-on with nonzero velocity.
    pub const fn is_note_on(&self) -> bool {
        match *self {
            Self::ThreeByte { status, data2, .. } => status & 0xF0 == 0x90 && data2 != 0,
            Self::TwoByte { .. } => false,
        }
    }

    /// True for a note-off, including note-on with velocity 0.
    pub const fn is_note_off(&self) -> bool {
        match *self {
            Self::ThreeByte { status, data2, .. } => {
                status & 0xF0 == 0x80 || (status & 0xF0 == 0x90 && data2 == 0)
            }
            Self::TwoByte { .. } => false,
        }
    }

    /// Note number for note-on/off messages.
    pub const fn note(&self) -> Option<u8> {
        match *self {
            Self::ThreeByte { status, data1, .. }
                if status & 0xF0 == 0x80 || status & 0xF0 == 0x90 =>
            {
                Some(data1)
            }
            _ => None,
        }
    }
}

/// A message pinned to a tick offset within a loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopEvent {
    /// Tick offset within the loop.
    pub tick: u32,
    pub msg: ShortMessage,
}

impl LoopEvent {
    pub const fn new(tick: u32, msg: ShortMessage) -> Self {
        Self { tick, msg }
    }
}
