//! Error types for stacksync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from template loading and parsing.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Underlying I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template document could not be parsed as JSON or YAML.
    #[error("malformed template from {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The template file did not exist at the expected path.
    #[error("template not found at {path}")]
    TemplateNotFound { path: PathBuf },
}
