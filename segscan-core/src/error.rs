use thiserror::Error;

use crate::scanner::ScanReport;

/// Invalid or incomplete scanner configuration. Always raised before any
/// segment is started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("table name is required")]
    MissingTableName,

    #[error("scan segment client is required")]
    MissingClient,

    #[error("total segment count must be greater than zero")]
    ZeroTotalSegments,

    #[error("local segment count must be greater than zero")]
    ZeroLocalSegments,

    #[error("local segment count {local} exceeds total segment count {total}")]
    LocalExceedsTotal { local: u32, total: u32 },

    #[error("offset {offset} with {local} local segments passes total {total}")]
    OffsetOutOfRange { offset: u32, local: u32, total: u32 },

    #[error("page limit must be greater than zero")]
    ZeroLimit,

    #[error("invalid retry policy: {0}")]
    InvalidRetry(String),
}

/// Failure of one remote scan-segment call. The engine treats every variant
/// as transient and retries the same request.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error returned by a [`BatchHandler`](crate::handler::BatchHandler).
#[derive(Error, Debug)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::with_source("batch handler failed", err)
    }
}

/// Why a segment stopped before its cursor chain was exhausted.
#[derive(Error, Debug)]
pub enum SegmentFailure {
    #[error("batch handler failed: {0}")]
    Handler(#[source] HandlerError),

    #[error("gave up after {attempts} consecutive failed calls: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last_error: RemoteError,
    },
}

/// Errors surfaced by [`Scanner::start`](crate::scanner::Scanner::start).
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("a scan is already running on this scanner")]
    AlreadyRunning,

    #[error(
        "scan cancelled after {} of {} segments",
        .report.segments_completed,
        .report.segments_planned
    )]
    Cancelled { report: Box<ScanReport> },

    #[error("handler failed on segment {segment}; scan aborted")]
    HandlerFailed {
        segment: u32,
        #[source]
        source: HandlerError,
    },

    #[error("segment {segment} task panicked")]
    SegmentPanicked { segment: u32 },
}

pub type Result<T> = std::result::Result<T, ScanError>;
