use thiserror::Error;

use lumen_session::SessionError;

/// Errors surfaced to command submitters.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Every reachable candidate failed to become a gateway. Periodic
    /// polling keeps retrying; the host should treat affected devices as
    /// unavailable meanwhile.
    #[error("no gateway available ({candidates} candidate(s) tried)")]
    NoGatewayAvailable { candidates: usize },
    /// A must-succeed command exhausted its attempts.
    #[error("command failed after {attempts} attempt(s)")]
    CommandFailed {
        attempts: u32,
        #[source]
        source: SessionError,
    },
    /// The scheduler worker is gone; commands can no longer be processed
    /// and the facility needs a supervisory restart.
    #[error("mesh worker is gone")]
    WorkerGone,
}
