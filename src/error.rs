//! Error taxonomy for route planning.
//!
//! Transport failures are the only retryable class; a well-formed error
//! response from a collaborator is final and surfaced as-is. Store errors
//! are kept separate because cache failures never fail a route computation.

use thiserror::Error;

/// Errors surfaced by the oracle and sequencer.
#[derive(Debug, Clone, Error)]
pub enum PlannerError {
    /// A stop reached the sequencer without usable coordinates.
    #[error("invalid stop {id}: {reason}")]
    InvalidStop { id: String, reason: String },

    /// `sequence()` was called with an empty stop list.
    #[error("no stops to sequence")]
    NoStops,

    /// The oracle exhausted its retry budget for a required pairwise lookup.
    #[error("distance unavailable after {attempts} attempts: {last_error}")]
    DistanceUnavailable { attempts: u32, last_error: String },

    /// A well-formed error response from a collaborator. Never retried.
    #[error("collaborator error ({kind}): {message}")]
    Collaborator {
        kind: CollaboratorKind,
        message: String,
    },

    /// Timeout, connection refused, or another transport-level failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The geocoding collaborator found no match for an address.
    #[error("address not found: {0}")]
    AddressNotFound(String),
}

impl PlannerError {
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Collaborator status classes, preserving the upstream status for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorKind {
    ZeroResults,
    QuotaExceeded,
    Denied,
    NotFound,
    Other(String),
}

impl CollaboratorKind {
    /// Maps a collaborator status string onto a kind.
    pub fn from_status(status: &str) -> Self {
        match status {
            "ZERO_RESULTS" => Self::ZeroResults,
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Self::QuotaExceeded,
            "REQUEST_DENIED" => Self::Denied,
            "NOT_FOUND" => Self::NotFound,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroResults => write!(f, "ZERO_RESULTS"),
            Self::QuotaExceeded => write!(f, "QUOTA_EXCEEDED"),
            Self::Denied => write!(f, "REQUEST_DENIED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Other(status) => write!(f, "{status}"),
        }
    }
}

/// Errors from the persistent fact store.
///
/// These stay on the cache/janitor side of the boundary: lookups degrade to
/// misses and writes are logged, so a store outage costs money (live oracle
/// calls), never correctness.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store transport failure: {0}")]
    Http(String),

    #[error("store rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed store row: {0}")]
    Malformed(String),

    /// The failure gate is closed; the store was not contacted.
    #[error("store access suppressed while cooling down")]
    Suppressed,
}

impl StoreError {
    pub(crate) fn http(err: &reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_preserves_unknown_statuses() {
        assert_eq!(
            CollaboratorKind::from_status("ZERO_RESULTS"),
            CollaboratorKind::ZeroResults
        );
        assert_eq!(
            CollaboratorKind::from_status("OVER_QUERY_LIMIT"),
            CollaboratorKind::QuotaExceeded
        );
        assert_eq!(
            CollaboratorKind::from_status("MAX_WAYPOINTS_EXCEEDED"),
            CollaboratorKind::Other("MAX_WAYPOINTS_EXCEEDED".to_string())
        );
    }

    #[test]
    fn display_includes_upstream_status() {
        let err = PlannerError::Collaborator {
            kind: CollaboratorKind::Other("UNKNOWN_ERROR".to_string()),
            message: "server error".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("UNKNOWN_ERROR"));
        assert!(text.contains("server error"));
    }
}
