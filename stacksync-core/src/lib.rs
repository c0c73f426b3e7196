//! Stacksync core library — template domain types, parsing, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and the resource/template model
//! - [`error`] — [`TemplateError`]
//! - [`template`] — parse / load the `Resources` section of a template

pub mod error;
pub mod template;
pub mod types;

pub use error::TemplateError;
pub use types::{Resource, ResourceIdentifier, ResourceKind, StackName, Template};
