//! Core type definitions for gemshare.
//!
//! This crate defines the host-agnostic types used throughout the sync core:
//! - Opaque node handles into the host's object graph
//! - Player labels (P1, P2, ...) and their log rendering
//! - Host member values and their numeric coercion
//!
//! Nothing here knows how a host locates objects or stores wallets; that
//! lives behind the collaborator traits in `gemshare-sync`.

mod ids;
mod label;
mod value;

pub use ids::{HookId, NodeId};
pub use label::{Label, LabelTag};
pub use value::{HostValue, ValueType, UNKNOWN_READING};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid label: {0:?}")]
    InvalidLabel(String),
}
