// SPDX-License-Identifier: MIT OR Apache-2.0
//! apr-error
//!
//! Unified error taxonomy for the protocol runtime.
//!
//! Every fallible operation in the runtime — schema checks, FSM transitions,
//! invariant evaluation, ledger mutation, template compilation — reports
//! through [`AprError`], a single classified error type carrying a closed
//! [`ErrorCode`] plus free-form diagnostic context. Crate-local error enums
//! (e.g. a config loader's parse errors) convert into `AprError` at their
//! boundary rather than leaking their own type across the workspace.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Broad classification a code falls into; used for metrics bucketing and
/// for deciding whether a failure is recoverable at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A single packet failed structural or protocol validation.
    Validation,
    /// A budget, deadline, or other bounded resource was exceeded.
    Resource,
    /// A contract between two components (layer/bus, token/directive,
    /// template/context) was violated.
    Contract,
    /// The episode or runtime itself cannot continue.
    Lifecycle,
    /// Configuration or serialization failure outside any single episode.
    Config,
}

/// Closed set of error codes produced anywhere in the runtime.
///
/// Variants map 1:1 onto the error kinds named in the component design:
/// the eight kinds a validator or runner can report, plus a handful of
/// codes needed by the ambient crates (config, protocol encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed packet; fatal to the packet, not to the episode.
    SchemaViolation,
    /// Illegal FSM transition or missing predecessor packet.
    FsmViolation,
    /// One of INV-001..INV-012 rejected the packet.
    InvariantViolation,
    /// A budget axis was exceeded without a prior approval.
    BudgetExceeded,
    /// Token expired, revoked, or usage-exhausted for a WRITE directive.
    TokenInvalid,
    /// A layer emitted a packet kind outside its declared `can_emit` set.
    LayerContractViolation,
    /// A step exceeded its time budget.
    StepTimeout,
    /// The episode is halted in safe-mode; no further packets admitted.
    EpisodeFatal,
    /// A packet arrived with no (or an unrecognized) `packet_kind`.
    UnknownPacketKind,
    /// A template was requested that does not exist.
    TemplateUnknown,
    /// The compilation context violates a template's declared constraints.
    TemplateConstraintViolation,
    /// No ledger exists for the given correlation id.
    LedgerNotFound,
    /// Deployment configuration failed to parse or validate.
    ConfigInvalid,
    /// JSON (de)serialization of a packet or envelope failed.
    SerializationFailed,
}

impl ErrorCode {
    /// All known error codes, for exhaustiveness tests and documentation.
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::SchemaViolation,
        ErrorCode::FsmViolation,
        ErrorCode::InvariantViolation,
        ErrorCode::BudgetExceeded,
        ErrorCode::TokenInvalid,
        ErrorCode::LayerContractViolation,
        ErrorCode::StepTimeout,
        ErrorCode::EpisodeFatal,
        ErrorCode::UnknownPacketKind,
        ErrorCode::TemplateUnknown,
        ErrorCode::TemplateConstraintViolation,
        ErrorCode::LedgerNotFound,
        ErrorCode::ConfigInvalid,
        ErrorCode::SerializationFailed,
    ];

    /// Classify this code into its broad category.
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::SchemaViolation
            | ErrorCode::FsmViolation
            | ErrorCode::InvariantViolation
            | ErrorCode::UnknownPacketKind => ErrorCategory::Validation,
            ErrorCode::BudgetExceeded | ErrorCode::StepTimeout => ErrorCategory::Resource,
            ErrorCode::TokenInvalid
            | ErrorCode::LayerContractViolation
            | ErrorCode::TemplateUnknown
            | ErrorCode::TemplateConstraintViolation => ErrorCategory::Contract,
            ErrorCode::EpisodeFatal | ErrorCode::LedgerNotFound => ErrorCategory::Lifecycle,
            ErrorCode::ConfigInvalid | ErrorCode::SerializationFailed => ErrorCategory::Config,
        }
    }

    /// Stable wire representation, e.g. `"SCHEMA_VIOLATION"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SchemaViolation => "SCHEMA_VIOLATION",
            ErrorCode::FsmViolation => "FSM_VIOLATION",
            ErrorCode::InvariantViolation => "INVARIANT_VIOLATION",
            ErrorCode::BudgetExceeded => "BUDGET_EXCEEDED",
            ErrorCode::TokenInvalid => "TOKEN_INVALID",
            ErrorCode::LayerContractViolation => "LAYER_CONTRACT_VIOLATION",
            ErrorCode::StepTimeout => "STEP_TIMEOUT",
            ErrorCode::EpisodeFatal => "EPISODE_FATAL",
            ErrorCode::UnknownPacketKind => "UNKNOWN_PACKET_KIND",
            ErrorCode::TemplateUnknown => "TEMPLATE_UNKNOWN",
            ErrorCode::TemplateConstraintViolation => "TEMPLATE_CONSTRAINT_VIOLATION",
            ErrorCode::LedgerNotFound => "LEDGER_NOT_FOUND",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::SerializationFailed => "SERIALIZATION_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified runtime error with free-form structured context.
///
/// `source` intentionally isn't serializable (it boxes an arbitrary
/// `std::error::Error`); [`AprError::to_dto`] produces a serializable
/// snapshot that flattens the source chain into a string.
pub struct AprError {
    /// Closed error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Underlying cause, if this error wraps another.
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    /// Structured diagnostic context (`field_path`, `invariant_code`,
    /// `packet_id`, ...).
    pub context: BTreeMap<String, Value>,
}

impl AprError {
    /// Construct a new error with no context or source.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a context key/value pair (builder-style).
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attach an underlying cause (builder-style).
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Produce a serializable snapshot of this error.
    #[must_use]
    pub fn to_dto(&self) -> AprErrorDto {
        AprErrorDto {
            code: self.code,
            message: self.message.clone(),
            source: self.source.as_ref().map(|s| s.to_string()),
            context: self.context.clone(),
        }
    }
}

impl fmt::Debug for AprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AprError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("context", &self.context)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

impl fmt::Display for AprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for AprError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

/// Serializable snapshot of an [`AprError`], suitable for wire responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AprErrorDto {
    /// Closed error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Flattened `Display` of the underlying cause, if any.
    pub source: Option<String>,
    /// Structured diagnostic context.
    pub context: BTreeMap<String, Value>,
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, AprError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_a_category() {
        for code in ErrorCode::ALL {
            let _ = code.category();
        }
    }

    #[test]
    fn every_code_round_trips_through_as_str() {
        for code in ErrorCode::ALL {
            assert!(!code.as_str().is_empty());
            assert_eq!(code.as_str(), code.to_string());
        }
    }

    #[test]
    fn all_codes_list_has_no_duplicates() {
        let mut seen = std::collections::BTreeSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.as_str()), "duplicate code {code}");
        }
    }

    #[test]
    fn with_context_accumulates_multiple_keys() {
        let err = AprError::new(ErrorCode::SchemaViolation, "bad packet")
            .with_context("field_path", "header.packet_id")
            .with_context("packet_id", "pkt_abc123");
        assert_eq!(err.context.len(), 2);
        assert_eq!(
            err.context.get("field_path"),
            Some(&Value::String("header.packet_id".into()))
        );
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = AprError::new(ErrorCode::BudgetExceeded, "token budget exhausted");
        let rendered = err.to_string();
        assert!(rendered.contains("BUDGET_EXCEEDED"));
        assert!(rendered.contains("token budget exhausted"));
    }

    #[test]
    fn source_chain_is_preserved() {
        let io_err = std::io::Error::other("disk full");
        let err = AprError::new(ErrorCode::ConfigInvalid, "could not read config").with_source(io_err);
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn to_dto_flattens_source_to_string() {
        let io_err = std::io::Error::other("boom");
        let err = AprError::new(ErrorCode::SerializationFailed, "failed").with_source(io_err);
        let dto = err.to_dto();
        assert_eq!(dto.source.as_deref(), Some("boom"));
    }

    #[test]
    fn dto_serializes_to_screaming_snake_case_code() {
        let err = AprError::new(ErrorCode::FsmViolation, "bad transition");
        let dto = err.to_dto();
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["code"], "FSM_VIOLATION");
    }

    #[test]
    fn categories_group_as_expected() {
        assert_eq!(ErrorCode::SchemaViolation.category(), ErrorCategory::Validation);
        assert_eq!(ErrorCode::BudgetExceeded.category(), ErrorCategory::Resource);
        assert_eq!(ErrorCode::TokenInvalid.category(), ErrorCategory::Contract);
        assert_eq!(ErrorCode::EpisodeFatal.category(), ErrorCategory::Lifecycle);
        assert_eq!(ErrorCode::ConfigInvalid.category(), ErrorCategory::Config);
    }
}
