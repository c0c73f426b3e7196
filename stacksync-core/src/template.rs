//! Template document loading.
//!
//! Only the `Resources` section of an infrastructure template is read; all
//! other sections are ignored by the sync engine. Documents are parsed with
//! `serde_yaml`, which accepts both YAML and JSON bodies.

use std::path::Path;

use serde::Deserialize;

use crate::error::TemplateError;
use crate::types::Template;

#[derive(Debug, Deserialize)]
struct TemplateDocument {
    #[serde(rename = "Resources", default)]
    resources: Template,
}

/// Parse a template body into its `Resources` section.
///
/// `origin` is a human-readable description of where the body came from
/// (file path, object key, stack name) used in error messages.
pub fn parse_str(body: &str, origin: &str) -> Result<Template, TemplateError> {
    let document: TemplateDocument =
        serde_yaml::from_str(body).map_err(|e| TemplateError::Malformed {
            origin: origin.to_owned(),
            source: e,
        })?;
    Ok(document.resources)
}

/// Load a template from a local file. No network access.
///
/// Returns [`TemplateError::TemplateNotFound`] if absent,
/// [`TemplateError::Malformed`] (with path context) if unparseable.
pub fn load_file(path: &Path) -> Result<Template, TemplateError> {
    if !path.exists() {
        return Err(TemplateError::TemplateNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| TemplateError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_str(&contents, &path.display().to_string())
}
