//! Tick error types.

use sqscale_core::{Signal, SourceError};
use thiserror::Error;

/// Why a tick ended without applying its decision.
///
/// All variants are recoverable: the next tick retries from scratch.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("failed to collect {signal}: {source}")]
    Collection {
        signal: Signal,
        #[source]
        source: SourceError,
    },

    #[error("failed to read replica count: {0}")]
    ReplicaRead(#[source] SourceError),

    #[error("failed to scale to {target} replicas: {source}")]
    ReplicaWrite {
        target: u32,
        #[source]
        source: SourceError,
    },
}

pub type TickResult<T> = Result<T, TickError>;
