
use crate::packet::CodecError;

/// Errors surfaced by the networking layer.
///
/// Protocol-level failures (invalid address, queue overflow, per-hop
/// timeout, end-to-end ACK timeout) are *not* represented here: they are
/// reported as `Ok(false)` from `send`/`send_direct`/`multicast`, matching
/// the boolean-return error model of the original firmware. This enum only
/// covers faults outside that vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError<E> {
    /// The radio reported itself as not present/initialized during `begin`.
    RadioNotValid,

    /// `begin` was called with an address outside the valid digit range
    /// for the current multicast setting.
    InvalidAddress,

    /// A received buffer could not be decoded into a frame.
    Codec(CodecError),

    /// Wrapper for unhandled underlying radio errors.
    Radio(E),
}

impl<E> From<CodecError> for NetworkError<E> {
    fn from(e: CodecError) -> Self {
        NetworkError::Codec(e)
    }
}
