//! Diagnostics channel for recoverable decode problems.
//!
//! Shape mismatches, unresolvable assets and identity fallbacks never fail a
//! load. They are reported here instead, through a sink the caller injects
//! into [`crate::document::DocumentReader`] and [`crate::asset::AssetLoader`].

use std::fmt;
use std::sync::Mutex;

use log::{debug, error, warn};
use uuid::Uuid;

use crate::asset::AssetError;
use crate::document::Shape;
use crate::logutil::escape_log;

/// A single recoverable problem found while decoding a player document.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A field (or list element, when `index` is set) had the wrong shape and
    /// was replaced by its fallback or dropped.
    ShapeMismatch {
        key: String,
        index: Option<usize>,
        expected: &'static str,
        found: Shape,
    },
    /// An asset entry could not be reconstructed and was skipped.
    AssetUnresolved {
        descriptor: String,
        owner: Uuid,
        cause: AssetError,
    },
    /// The stored `unique-id` was missing or unparsable; the lookup identity was kept.
    IdentityFallback { kept: Uuid, stored: Option<String> },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ShapeMismatch {
                key,
                index: Some(i),
                expected,
                found,
            } => write!(
                f,
                "dropped element {} of '{}': expected {}, found {}",
                i, key, expected, found
            ),
            Diagnostic::ShapeMismatch {
                key,
                index: None,
                expected,
                found,
            } => write!(
                f,
                "field '{}' fell back: expected {}, found {}",
                key, expected, found
            ),
            Diagnostic::AssetUnresolved {
                descriptor,
                owner,
                cause,
            } => write!(
                f,
                "could not load asset '{}' for player {}: {}",
                escape_log(descriptor),
                owner,
                escape_log(&cause.to_string())
            ),
            Diagnostic::IdentityFallback { kept, stored } => match stored {
                Some(raw) => write!(
                    f,
                    "stored unique-id '{}' is not a UUID; keeping {}",
                    escape_log(raw),
                    kept
                ),
                None => write!(f, "document has no unique-id; keeping {}", kept),
            },
        }
    }
}

/// Receives diagnostics emitted while decoding.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticsSink for LogDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::ShapeMismatch { .. } => debug!("{}", diagnostic),
            Diagnostic::AssetUnresolved { .. } => error!("{}", diagnostic),
            Diagnostic::IdentityFallback { .. } => warn!("{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory. Used by tests and the `check` command.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of skipped asset entries seen so far.
    pub fn unresolved_assets(&self) -> usize {
        self.entries()
            .iter()
            .filter(|d| matches!(d, Diagnostic::AssetUnresolved { .. }))
            .count()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        }
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(diagnostic);
        }
    }
}
