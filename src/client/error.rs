// ABOUTME: Debug-session error types for all client operations
// ABOUTME: Structured reporting with automatic conversion from underlying I/O errors

use crate::datatypes::Command;
use std::io;
use thiserror::Error;

/// Error type for debug-session operations.
///
/// Wire-level failures collapse into three cases the front-end treats the
/// same way (retry or surface): no response, a non-OK response code, and a
/// response that would not parse. Resolution failures carry enough context
/// to point at the offending breakpoint request.
#[derive(Debug, Error)]
pub enum DebugError {
    /// I/O error while connecting
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// The command got no response: write failure, timeout, or dead transport
    #[error("no response to {0:?}")]
    NoResponse(Command),

    /// The agent answered with a non-OK response code
    #[error("{0:?} failed on the target")]
    CommandFailed(Command),

    /// The response payload did not parse
    #[error("malformed response to {0:?}")]
    MalformedResponse(Command),

    /// No line info exists for a requested breakpoint line
    #[error("no executable code at {source_path}:{line}")]
    LineNotResolved { line: u32, source_path: String },

    /// A stack frame id the target does not know
    #[error("unknown stack frame {0}")]
    UnknownFrame(u32),

    /// A class the loader cannot provide
    #[error("class not loadable: {0}")]
    ClassNotLoaded(String),
}

/// Result type alias for debug-session operations.
pub type DebugResult<T> = Result<T, DebugError>;
