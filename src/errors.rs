//! Submodule defining the errors used across the crate.

use alloc::string::String;
use core::fmt;

/// The request an upload was processing when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The cleanup query sent before any batch.
    Cleanup,
    /// A seed batch, numbered from 1.
    Batch {
        /// 1-based index of the batch.
        index: usize,
        /// Total number of batches of the run.
        total: usize,
    },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cleanup => write!(f, "cleanup"),
            Self::Batch { index, total } => write!(f, "batch {index}/{total}"),
        }
    }
}

/// Errors that stop an upload run.
///
/// Every variant is terminal: the uploader never retries and never sends the
/// requests that follow the failing one. Requests that completed before the
/// failure stay applied on the remote side.
#[derive(Debug, thiserror::Error)]
pub enum UploadError<E>
where
    E: core::error::Error + 'static,
{
    /// The endpoint could not be reached or did not answer in time.
    #[error("{phase} failed: {source}")]
    Transport {
        /// Request that failed.
        phase: Phase,
        /// Underlying transport error.
        source: E,
    },
    /// The endpoint answered and reported a query error.
    #[error("{phase} rejected: {message}")]
    Rejected {
        /// Request that was rejected.
        phase: Phase,
        /// Error message reported by the endpoint.
        message: String,
        /// Leading part of the rejected query text.
        preview: String,
    },
}

impl<E> UploadError<E>
where
    E: core::error::Error + 'static,
{
    /// The request the run stopped at.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Transport { phase, .. } | Self::Rejected { phase, .. } => *phase,
        }
    }
}
