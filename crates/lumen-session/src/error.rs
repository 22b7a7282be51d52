use std::time::Duration;

use thiserror::Error;

use lumen_codec::CodecError;
use lumen_transport::TransportError;

/// Errors surfaced by session establishment and use.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Device rejected the pairing proof; the mesh name/password are wrong
    /// for this device.
    #[error("pairing rejected: check mesh name and password")]
    PairingRejected,
    /// Pairing reply carried an opcode outside the handshake protocol.
    #[error("unexpected pairing reply 0x{0:02X}")]
    UnexpectedPairReply(u8),
    /// The handshake did not complete within the connect budget.
    #[error("session establishment timed out after {0:?}")]
    Timeout(Duration),
    /// Command issued without an authenticated session.
    #[error("session is not authenticated")]
    NotAuthenticated,
    /// Device refused the credential update.
    #[error("credential update refused (reply 0x{0:02X})")]
    CredentialUpdateRefused(u8),
    /// Underlying link failure; the session key has been cleared.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Packet construction/parsing failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl SessionError {
    /// Whether this failure means the candidate device timed out rather
    /// than actively rejecting us (the scheduler treats both as
    /// candidate-local, but logs them differently).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SessionError::Timeout(_)
                | SessionError::Transport(TransportError::ConnectTimeout { .. })
        )
    }
}
