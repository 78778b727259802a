//! Persistence formats for loopcore.
//!
//! Serializes clips to the native binary format and exports them as
//! Standard MIDI Files.

mod clip_format;
mod smf_export;

pub use clip_format::{clip_from_bytes, clip_to_bytes, CLIP_MAGIC, CLIP_VERSION};
pub use smf_export::{clip_to_smf, clips_to_smf};

/// Error type for clip serialization.
#[derive(Debug)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    InvalidHeader,
    /// Unexpected end of file
    UnexpectedEof,
    /// Unsupported format version or tick resolution
    UnsupportedVersion,
    /// Event count exceeds the per-track capacity
    TooManyEvents,
    /// Malformed event record
    InvalidEvent,
    /// I/O error
    Io(String),
}

impl From<binrw::Error> for FormatError {
    fn from(err: binrw::Error) -> Self {
        // binrw's derive-generated readers wrap field-level errors in
        // `Error::Backtrace`, so classify the root cause, not the wrapper.
        match err.root_cause() {
            binrw::Error::BadMagic { .. } => FormatError::InvalidHeader,
            binrw::Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                FormatError::UnexpectedEof
            }
            _ => FormatError::Io(err.to_string()),
        }
    }
}
