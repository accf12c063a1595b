/// Errors that can occur while driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] lorabridge_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] lorabridge_frame::FrameError),

    /// `start` was called on a running session.
    #[error("session already started")]
    AlreadyStarted,

    /// The operation needs a running session.
    #[error("session not started")]
    NotStarted,

    /// A transport is already attached to this session.
    #[error("transport already attached")]
    AlreadyAttached,

    /// No transport is attached, so nothing can be sent.
    #[error("no transport attached")]
    NotConnected,

    /// A background task panicked or was aborted.
    #[error("session task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        SessionError::TaskFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
