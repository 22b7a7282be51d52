use thiserror::Error;

/// Errors returned by packet build/decrypt operations.
///
/// Decode failures are always recoverable: callers drop the frame and move
/// on, they never tear anything down because of a bad packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Packet or reply does not have the expected length.
    #[error("invalid packet length: expected {expected} bytes, got {got}")]
    PacketLength { expected: usize, got: usize },
    /// Recomputed checksum does not match the packet's check bytes.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// Invalid caller input (oversized command data, credentials, ...).
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}
