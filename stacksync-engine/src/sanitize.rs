//! Template sanitization — normalization ahead of structural comparison.
//!
//! Strips the property fields that encode a code/artifact location, plus the
//! build-tooling `Metadata` block, so that two templates differing only in
//! where their artifacts live compare equal. The returned set of logical ids
//! names the resources eligible for direct code sync.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use stacksync_core::{Resource, ResourceKind, Template};

/// A property field path holding an artifact location, e.g. `Code.S3Bucket`.
pub type FieldPath = &'static [&'static str];

/// Field-strip table: which property paths encode a code/artifact location
/// for a given resource type.
///
/// `Code.ZipFile` is deliberately absent — inline code is compared verbatim.
/// So is the nested stack's `TemplateURL`: it drives recursion and is
/// compared verbatim at each level.
pub fn stripped_fields(kind: &ResourceKind) -> &'static [FieldPath] {
    match kind {
        ResourceKind::ServerlessFunction => &[&["CodeUri"], &["ImageUri"]],
        ResourceKind::LambdaFunction => &[
            &["Code", "ImageUri"],
            &["Code", "S3Bucket"],
            &["Code", "S3Key"],
            &["Code", "S3ObjectVersion"],
        ],
        ResourceKind::ServerlessLayer => &[&["ContentUri"]],
        ResourceKind::LambdaLayer => &[&["Content"]],
        ResourceKind::ServerlessApi
        | ResourceKind::ServerlessHttpApi
        | ResourceKind::ServerlessStateMachine => &[&["DefinitionUri"]],
        ResourceKind::RestApi | ResourceKind::HttpApi => &[&["BodyS3Location"]],
        ResourceKind::StateMachine => &[&["DefinitionS3Location"]],
        ResourceKind::ServerlessApplication => &[&["Location"]],
        ResourceKind::NestedStack | ResourceKind::Other(_) => &[],
    }
}

/// Structural "is this a local, unresolved path" predicate.
///
/// A plain string not beginning with a recognized remote-URI scheme is
/// local; a mapping (e.g. a SAR repository descriptor) is never local.
pub fn is_local_path(value: &Value) -> bool {
    match value {
        Value::String(s) => !has_remote_scheme(s),
        _ => false,
    }
}

fn has_remote_scheme(s: &str) -> bool {
    s.starts_with("s3://") || s.starts_with("http://") || s.starts_with("https://")
}

/// Sanitize every resource of `template` in place.
///
/// For each resource: remove `Metadata`; for each field in its strip-table
/// entry, remove the field from `Properties` unless
/// (a) the logical id is in `linked_resources` — an ancestor already decided
///     this subtree needs a full sync, so stripping is skipped to force
///     inequality — or
/// (b) a `reference` template is given and the corresponding field in the
///     reference is not local (a resource whose reference copy already
///     points at a remote artifact cannot be re-derived as locally
///     authored).
///
/// Returns the logical ids eligible for code-only sync. Idempotent:
/// sanitizing an already-sanitized template is a no-op with the same
/// membership.
pub fn sanitize_template(
    template: &mut Template,
    linked_resources: &BTreeSet<String>,
    reference: Option<&Template>,
) -> BTreeSet<String> {
    let mut modified = BTreeSet::new();
    for (logical_id, resource) in template.iter_mut() {
        resource.metadata = None;
        let reference_resource = reference.and_then(|t| t.get(logical_id));
        if sanitize_resource(logical_id, resource, linked_resources, reference_resource) {
            modified.insert(logical_id.clone());
        }
    }
    modified
}

fn sanitize_resource(
    logical_id: &str,
    resource: &mut Resource,
    linked_resources: &BTreeSet<String>,
    reference: Option<&Resource>,
) -> bool {
    let fields = stripped_fields(&resource.kind);
    if fields.is_empty() {
        return false;
    }
    if linked_resources.contains(logical_id) {
        // Leave the location fields in place so the comparison cannot come
        // out equal for a subtree already condemned to a full sync.
        return false;
    }

    let mut touched = false;
    for path in fields {
        if let Some(reference) = reference {
            match lookup_field(&reference.properties, path) {
                Some(value) if is_local_path(value) => {}
                // Reference copy is remote or absent: localness cannot be
                // derived, so the field stays put.
                _ => continue,
            }
        }
        // A linked application's repository descriptor is an identity, not
        // a code location; it stays in place and compares by value. Every
        // other table field is removed whatever its shape: the packager
        // emits bucket/key mappings for layers, APIs, and state machines.
        if matches!(resource.kind, ResourceKind::ServerlessApplication)
            && matches!(
                lookup_field(&resource.properties, path),
                Some(Value::Object(_))
            )
        {
            continue;
        }
        strip_field(&mut resource.properties, path);
        touched = true;
    }
    touched
}

/// Resolve a field path against a reference property bag.
///
/// If an intermediate node is not a mapping, that value is the location
/// itself: the built template may hold a bare string where the packaged one
/// holds a mapping (e.g. a primitive function's `Code: "local/"`).
fn lookup_field<'a>(properties: &'a Map<String, Value>, path: FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = properties.get(*first)?;
    for segment in rest {
        match current {
            Value::Object(map) => current = map.get(*segment)?,
            _ => break,
        }
    }
    Some(current)
}

/// Remove the field at `path` from the property bag. A missing parent or
/// an already-removed leaf is a no-op, which keeps repeated sanitization a
/// fixpoint.
fn strip_field(properties: &mut Map<String, Value>, path: FieldPath) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = properties;
    for segment in parents {
        match current.get_mut(*segment) {
            Some(Value::Object(map)) => current = map,
            _ => return,
        }
    }
    current.remove(*last);
}
