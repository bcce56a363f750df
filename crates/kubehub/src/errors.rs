//! Two-tier error policy for retrievals.
//!
//! A failed primary retrieval is critical and aborts the request. A failed secondary
//! (enrichment) retrieval, or a degraded primary one, is recorded as an
//! [`ErrorInfo`] and the request continues with whatever data arrived.

use kdash_core::{ErrorInfo, ResourceKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::ClusterError;
use crate::fetch::Fetched;

/// What a retrieval contributes to its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The collection the request lists.
    Primary,
    /// Supplementary data used to enrich primary records.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    NonCritical,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("listing {kind} failed: {source}")]
pub struct RetrievalError {
    pub kind: ResourceKind,
    pub role: Role,
    #[source]
    pub source: ClusterError,
}

impl RetrievalError {
    pub fn new(kind: ResourceKind, role: Role, source: ClusterError) -> Self { Self { kind, role, source } }

    pub fn severity(&self) -> Severity {
        match (self.role, &self.source) {
            (Role::Secondary, _) | (_, ClusterError::Degraded(_)) => Severity::NonCritical,
            (Role::Primary, _) => Severity::Critical,
        }
    }

    pub fn is_critical(&self) -> bool { self.severity() == Severity::Critical }

    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            kind: Some(self.kind),
            status: self.source.status(),
            reason: self.source.reason().to_string(),
            message: self.source.to_string(),
        }
    }
}

/// Classify one retrieval error: `(non_critical, critical)`.
pub fn classify(err: Option<&RetrievalError>) -> (Vec<ErrorInfo>, Option<RetrievalError>) {
    append_error(err, Vec::new())
}

/// Classify `err` on top of errors already collected. A critical error is returned
/// alongside the untouched list; a non-critical one is appended.
pub fn append_error(
    err: Option<&RetrievalError>,
    mut non_critical: Vec<ErrorInfo>,
) -> (Vec<ErrorInfo>, Option<RetrievalError>) {
    match err {
        None => (non_critical, None),
        Some(e) if e.is_critical() => (non_critical, Some(e.clone())),
        Some(e) => {
            non_critical.push(e.to_info());
            (non_critical, None)
        }
    }
}

/// Non-critical errors collected across one request's joins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorAccumulator {
    non_critical: Vec<ErrorInfo>,
}

impl ErrorAccumulator {
    pub fn new() -> Self { Self::default() }

    /// Record `err`, or short-circuit with it when critical.
    pub fn accumulate(self, err: Option<&RetrievalError>) -> Result<Self, RetrievalError> {
        let (non_critical, critical) = append_error(err, self.non_critical);
        if let Some(e) = critical {
            return Err(e);
        }
        if let Some(e) = err {
            warn!(kind = %e.kind, role = ?e.role, error = %e.source, "non-critical retrieval error");
        }
        Ok(Self { non_critical })
    }

    /// Join one retrieval: its items when it may be used, or the critical error.
    pub fn join<K>(self, fetched: Fetched<K>) -> Result<(Self, Vec<K>), RetrievalError> {
        let acc = self.accumulate(fetched.error.as_ref())?;
        Ok((acc, fetched.items))
    }

    pub fn errors(&self) -> &[ErrorInfo] { &self.non_critical }

    pub fn into_errors(self) -> Vec<ErrorInfo> { self.non_critical }
}
