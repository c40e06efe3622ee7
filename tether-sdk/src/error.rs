/// Failure reported by the device SDK through a completion or result channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("timed out")]
    Timeout,
    #[error("unauthorized")]
    Unauthorized,
    #[error("device unreachable")]
    Unreachable,
    /// Cloud sync or certificate transfer aborted mid-stream
    #[error("aborted: {0}")]
    Aborted(String),
    #[error("no bluetooth adapter found")]
    NoAdapter,
    #[error("{0}")]
    Other(String),
}

impl SdkError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
