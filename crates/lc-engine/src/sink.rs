//! Output seams: message emission and humanize jitter.

use lc_model::ShortMessage;

/// Delay-capable message output, injected into the engine at construction.
///
/// The engine stamps every emission with a delay in milliseconds (the
/// humanize jitter); delivery itself belongs to the sink, typically a
/// delay queue feeding the routing fabric.
pub trait MessageSink {
    fn send(&mut self, msg: ShortMessage, delay_ms: u16);
}

/// Supplies per-emission timing jitter in milliseconds.
///
/// Owned by the humanize collaborator; the engine only consumes the
/// offsets. Negative jitter clamps to an immediate send.
pub trait Humanizer {
    fn jitter_ms(&mut self) -> i8;
}

/// No jitter: every emission goes out immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHumanize;

impl Humanizer for NoHumanize {
    fn jitter_ms(&mut self) -> i8 {
        0
    }
}
