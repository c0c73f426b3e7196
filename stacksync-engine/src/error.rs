//! Error types for stacksync-engine.
//!
//! Taxonomy per the propagation policy: [`SyncError::NotFound`] is the
//! single expected failure mode (the reconciler converts it into "full sync
//! required" at the point of occurrence); everything else is fatal and
//! surfaces to the caller unchanged.

use std::path::PathBuf;

use thiserror::Error;

use stacksync_core::TemplateError;

/// All errors that can arise from sync decision operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Stack, template, or remote object absent — the sanctioned
    /// "first deployment" signal, never retried.
    #[error("not found: {0}")]
    NotFound(String),

    /// Template loading/parsing failure (malformed documents abort the
    /// sync attempt).
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Control-plane or storage failure other than not-found. No automatic
    /// retry at this layer; retry policy belongs to the client collaborator.
    #[error("client error: {0}")]
    Client(String),

    /// HTTP transport failure while fetching a signed-URL template.
    #[error("HTTP fetch failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (sync state store).
    #[error("sync state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.stacksync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
