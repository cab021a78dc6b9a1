//! Error types for the sync layer.

use gemshare_types::NodeId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for calls into the host.
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by a host collaborator. All of them are per-call and
/// transient from the core's point of view.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    /// The node was destroyed by the host.
    #[error("node {0} is no longer alive")]
    NodeGone(NodeId),

    /// The member does not exist on the node's capabilities.
    #[error("member {capability}.{member} not found")]
    MemberNotFound { capability: String, member: String },

    /// The member exists but did not yield a usable value.
    #[error("member {0} is not numeric")]
    NotNumeric(String),

    /// The host refused a mutation.
    #[error("host rejected write: {0}")]
    Rejected(String),

    /// The host does not support the requested operation.
    #[error("unsupported host operation: {0}")]
    Unsupported(String),
}

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A host call failed.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// A configured name pattern does not compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A label hint could not be tied to any player root.
    #[error("could not resolve {label:?} to a player root: {reason}")]
    Resolution { label: String, reason: String },

    /// No readable resource was found on a node.
    #[error("no readable resource on node {0}")]
    Probe(NodeId),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}

/// Compiles a case-insensitive name pattern.
pub(crate) fn compile_pattern(pattern: &str) -> SyncResult<regex_lite::Regex> {
    regex_lite::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| SyncError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}
