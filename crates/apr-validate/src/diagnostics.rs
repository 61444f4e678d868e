// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared diagnostic types produced by every validator.

use std::fmt;

/// Severity of one diagnostic. Only `Error` rejects the packet; `Warning`
/// is logged but does not block admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks admission.
    Error,
    /// Logged, does not block admission.
    Warning,
}

/// One problem found by a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stable code, e.g. `"INV-002"` or `"SCHEMA"`.
    pub code: &'static str,
    /// Dotted path to the offending field, e.g. `"mcp.epistemics.confidence"`.
    pub field_path: String,
    /// Human-readable explanation.
    pub message: String,
    /// Whether this diagnostic rejects the packet.
    pub severity: Severity,
}

impl Diagnostic {
    /// Construct an error-severity diagnostic.
    pub fn error(code: &'static str, field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code, field_path: field_path.into(), message: message.into(), severity: Severity::Error }
    }

    /// Construct a warning-severity diagnostic.
    pub fn warning(code: &'static str, field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code, field_path: field_path.into(), message: message.into(), severity: Severity::Warning }
    }

    /// Whether this diagnostic rejects the packet.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.field_path, self.message)
    }
}

/// All diagnostics produced for one packet by one validator pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    /// No diagnostics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Merge another diagnostic set into this one.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// Whether any diagnostic is error-severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Whether no diagnostics were recorded at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate error-severity diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    /// Iterate warning-severity diagnostics only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }
}
