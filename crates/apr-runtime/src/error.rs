// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors from the episode runner and integrity overlay.

use apr_error::{AprError, ErrorCode};
use thiserror::Error;

/// Errors the runner can report outside of ordinary validator rejections
/// (those are carried inline in a [`crate::step::StepOutcome`]).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No template registered under this name.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// A step named an `owner_layer` with no registered implementation.
    #[error("no layer registered for {0:?}")]
    UnregisteredLayer(apr_core::SourceLayer),

    /// The external layer invocation returned an error.
    #[error("layer invocation failed")]
    LayerInvocationFailed(#[source] anyhow::Error),

    /// A step did not complete within its `time_budget_seconds` deadline.
    #[error("step '{step_id}' timed out after {deadline_seconds}s")]
    StepTimeout {
        /// The step that timed out.
        step_id: String,
        /// The deadline that was exceeded.
        deadline_seconds: u64,
    },

    /// The episode exceeded its configured step ceiling without reaching
    /// an exit step.
    #[error("episode exceeded max_steps ({0})")]
    MaxStepsExceeded(u32),

    /// A candidate packet was rejected by the admission pipeline and the
    /// failure was not recoverable (not a warning-only invariant).
    #[error("step '{step_id}' failed: packet '{packet_id}' was rejected")]
    StepFailed {
        /// The step that failed.
        step_id: String,
        /// The rejected candidate's id.
        packet_id: String,
    },

    /// The episode's ledger is halted in safe-mode; no further packets
    /// may be admitted.
    #[error("episode is halted in safe-mode")]
    EpisodeFatal,

    /// An error from the unified error taxonomy, passed through unchanged.
    #[error("{0}")]
    Classified(#[from] AprError),
}

impl RuntimeError {
    /// Map this error onto the closed [`ErrorCode`] taxonomy.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownTemplate(_) => ErrorCode::TemplateUnknown,
            Self::UnregisteredLayer(_) => ErrorCode::LayerContractViolation,
            Self::LayerInvocationFailed(_) => ErrorCode::LayerContractViolation,
            Self::StepTimeout { .. } => ErrorCode::StepTimeout,
            Self::MaxStepsExceeded(_) => ErrorCode::EpisodeFatal,
            Self::StepFailed { .. } => ErrorCode::InvariantViolation,
            Self::EpisodeFatal => ErrorCode::EpisodeFatal,
            Self::Classified(e) => e.code,
        }
    }

    /// Convert into the workspace's unified [`AprError`].
    #[must_use]
    pub fn into_apr_error(self) -> AprError {
        match self {
            Self::Classified(e) => e,
            other => {
                let code = other.error_code();
                let message = other.to_string();
                AprError::new(code, message)
            }
        }
    }
}

impl From<RuntimeError> for AprError {
    fn from(value: RuntimeError) -> Self {
        value.into_apr_error()
    }
}
