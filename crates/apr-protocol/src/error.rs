// SPDX-License-Identifier: MIT OR Apache-2.0
//! Local error type for wire decoding, converted into [`apr_error::AprError`]
//! at the crate boundary.

use apr_error::{AprError, ErrorCode};
use thiserror::Error;

/// Failures that can occur while encoding or decoding packets and
/// episode logs.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The bytes were not valid JSON, or didn't match the packet schema.
    #[error("malformed packet at line {line}: {source}")]
    MalformedPacket {
        /// 1-indexed line number within the episode log, or 1 for a
        /// single-packet decode.
        line: usize,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// `header.packet_kind` was not one of the nine known kinds.
    #[error("unknown packet kind {kind:?} at line {line}")]
    UnknownPacketKind {
        /// 1-indexed line number.
        line: usize,
        /// The raw `packet_kind` string encountered.
        kind: String,
    },
    /// An episode log mixed more than one `correlation_id`.
    #[error("episode log line {line} has correlation_id {found:?}, expected {expected:?}")]
    CorrelationMismatch {
        /// 1-indexed line number.
        line: usize,
        /// `correlation_id` the reader was tracking.
        expected: String,
        /// `correlation_id` found on this line.
        found: String,
    },
    /// Underlying I/O failure reading or writing a log.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProtocolError> for AprError {
    fn from(err: ProtocolError) -> Self {
        let code = match &err {
            ProtocolError::MalformedPacket { .. } => ErrorCode::SchemaViolation,
            ProtocolError::UnknownPacketKind { .. } => ErrorCode::UnknownPacketKind,
            ProtocolError::CorrelationMismatch { .. } => ErrorCode::SchemaViolation,
            ProtocolError::Io(_) => ErrorCode::SerializationFailed,
        };
        AprError::new(code, err.to_string()).with_source(err)
    }
}
