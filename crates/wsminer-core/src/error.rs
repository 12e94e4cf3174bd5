//! Shared error type across wsminer crates.

use thiserror::Error;

/// Stable error codes (used in logs and test vectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Length prefix is not an 8-digit decimal.
    MalformedLength,
    /// Header slice is missing or not a JSON object.
    MalformedHeader,
    /// Body declared as JSON failed to parse.
    MalformedBody,
    /// Header `type` is not a known tunnel message.
    UnknownType,
    /// Well-formed envelope with missing or mistyped protocol fields.
    InvalidMessage,
    /// Public request for a connection id that is not registered.
    UnknownConnection,
    /// Relay received a response envelope for an exchange it does not track.
    UnregisteredSocket,
    /// Miner received a request envelope for a stream it does not track.
    UnregisteredStream,
    /// A request id was registered twice.
    DuplicateRequest,
    /// Invalid configuration or input.
    BadRequest,
    /// Unsupported config version.
    UnsupportedVersion,
    /// WebSocket transport failure.
    Transport,
    /// Upstream HTTP failure.
    Upstream,
    /// Exchange idle timeout elapsed.
    Timeout,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MalformedLength => "MALFORMED_LENGTH",
            ErrorCode::MalformedHeader => "MALFORMED_HEADER",
            ErrorCode::MalformedBody => "MALFORMED_BODY",
            ErrorCode::UnknownType => "UNKNOWN_TYPE",
            ErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ErrorCode::UnknownConnection => "UNKNOWN_CONNECTION",
            ErrorCode::UnregisteredSocket => "UNREGISTERED_SOCKET",
            ErrorCode::UnregisteredStream => "UNREGISTERED_STREAM",
            ErrorCode::DuplicateRequest => "DUPLICATE_REQUEST",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Upstream => "UPSTREAM",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, WsMinerError>;

/// Unified error type used by core, relay and miner.
#[derive(Debug, Error)]
pub enum WsMinerError {
    #[error("malformed length prefix: {0}")]
    MalformedLength(String),
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("malformed body: {0}")]
    MalformedBody(String),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("unknown connection: {0}")]
    UnknownConnection(String),
    #[error("no exchange registered for request {0}")]
    UnregisteredSocket(String),
    #[error("no upstream stream registered for request {0}")]
    UnregisteredStream(String),
    #[error("request id already registered: {0}")]
    DuplicateRequest(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("transport: {0}")]
    Transport(String),
    #[error("upstream: {0}")]
    Upstream(String),
    #[error("exchange timed out")]
    Timeout,
    #[error("internal: {0}")]
    Internal(String),
}

impl WsMinerError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            WsMinerError::MalformedLength(_) => ErrorCode::MalformedLength,
            WsMinerError::MalformedHeader(_) => ErrorCode::MalformedHeader,
            WsMinerError::MalformedBody(_) => ErrorCode::MalformedBody,
            WsMinerError::UnknownType(_) => ErrorCode::UnknownType,
            WsMinerError::InvalidMessage(_) => ErrorCode::InvalidMessage,
            WsMinerError::UnknownConnection(_) => ErrorCode::UnknownConnection,
            WsMinerError::UnregisteredSocket(_) => ErrorCode::UnregisteredSocket,
            WsMinerError::UnregisteredStream(_) => ErrorCode::UnregisteredStream,
            WsMinerError::DuplicateRequest(_) => ErrorCode::DuplicateRequest,
            WsMinerError::BadRequest(_) => ErrorCode::BadRequest,
            WsMinerError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            WsMinerError::Transport(_) => ErrorCode::Transport,
            WsMinerError::Upstream(_) => ErrorCode::Upstream,
            WsMinerError::Timeout => ErrorCode::Timeout,
            WsMinerError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Decode-time failures: the frame is dropped, the tunnel stays up.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::MalformedLength
                | ErrorCode::MalformedHeader
                | ErrorCode::MalformedBody
                | ErrorCode::UnknownType
                | ErrorCode::InvalidMessage
        )
    }
}
