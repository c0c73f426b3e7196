//! Recursive skip decision over deployed vs. built/packaged templates.
//!
//! Verdict precedence per stack frame:
//! 1. `Indeterminate` (no deployed template — first deployment)
//! 2. `Diverged` (sanitized packaged != sanitized deployed, or linked
//!    applications referencing different repository entries)
//! 3. `Skippable` (only code/artifact locations changed)
//!
//! The overall verdict is the conjunction over every frame; frames are
//! processed depth-first from an explicit work stack so recursion depth is
//! bounded by template size, not call-stack size.

use std::collections::BTreeSet;

use serde_json::Value;
use similar::TextDiff;

use stacksync_core::{ResourceIdentifier, ResourceKind, StackName, Template};

use crate::client::CloudClient;
use crate::sanitize::sanitize_template;
use crate::source::{self, TemplateLocator};
use crate::SyncError;

/// Outcome of the skip decision for one stack tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipVerdict {
    /// Every difference is a code/artifact location; deploy can be skipped.
    Skippable,
    /// A property outside the field-strip table differs.
    Diverged,
    /// The comparison could not be made (typically: nothing deployed yet).
    Indeterminate(String),
}

impl SkipVerdict {
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Skippable)
    }
}

/// One pending stack level: where to read its three templates from, and the
/// identifier prefix its resources are recorded under.
#[derive(Debug)]
struct Frame {
    stack_name: StackName,
    built: TemplateLocator,
    packaged: TemplateLocator,
    prefix: ResourceIdentifier,
    /// Only frames whose built template is locally authored contribute to
    /// `code_sync_resources`; a remote-authored child is reconciled for the
    /// verdict but cannot be code-synced.
    locally_authored: bool,
}

/// Location fields of a stack-like resource, captured before sanitization
/// strips them.
#[derive(Debug)]
struct NestedRef {
    logical_id: String,
    built_location: Option<Value>,
    packaged_location: Option<Value>,
}

/// The recursive template-reconciliation engine.
pub struct Reconciler<'c, C: CloudClient> {
    client: &'c C,
    code_sync_resources: BTreeSet<ResourceIdentifier>,
}

impl<'c, C: CloudClient> Reconciler<'c, C> {
    pub fn new(client: &'c C) -> Self {
        Self {
            client,
            code_sync_resources: BTreeSet::new(),
        }
    }

    /// Resources that differ only in code/artifact location, qualified by
    /// their nested-stack path. Populated only when the last
    /// [`auto_skip`](Self::auto_skip) returned [`SkipVerdict::Skippable`].
    pub fn code_sync_resources(&self) -> &BTreeSet<ResourceIdentifier> {
        &self.code_sync_resources
    }

    pub fn into_code_sync_resources(self) -> BTreeSet<ResourceIdentifier> {
        self.code_sync_resources
    }

    /// Decide whether the full deployment of `stack_name` can be skipped.
    ///
    /// Walks every nested stack and linked application reachable from the
    /// root templates; the result is the conjunction of all per-level
    /// verdicts. A missing deployed template at any level yields
    /// [`SkipVerdict::Indeterminate`] without raising; every other failure
    /// is fatal.
    pub fn auto_skip(
        &mut self,
        built: &TemplateLocator,
        packaged: &TemplateLocator,
        stack_name: &StackName,
    ) -> Result<SkipVerdict, SyncError> {
        self.code_sync_resources.clear();

        let mut frames = vec![Frame {
            stack_name: stack_name.clone(),
            built: built.clone(),
            packaged: packaged.clone(),
            prefix: ResourceIdentifier::root(),
            locally_authored: built.is_local(),
        }];

        while let Some(frame) = frames.pop() {
            let verdict = match self.reconcile_frame(&frame, &mut frames) {
                Ok(verdict) => verdict,
                Err(err) => {
                    // Candidates from frames already walked are meaningless
                    // once the walk aborts.
                    self.code_sync_resources.clear();
                    return Err(err);
                }
            };
            if !verdict.is_skippable() {
                self.code_sync_resources.clear();
                return Ok(verdict);
            }
        }
        tracing::info!(
            "stack {stack_name}: infra sync skippable, {} code-sync resource(s)",
            self.code_sync_resources.len()
        );
        Ok(SkipVerdict::Skippable)
    }

    fn reconcile_frame(
        &mut self,
        frame: &Frame,
        frames: &mut Vec<Frame>,
    ) -> Result<SkipVerdict, SyncError> {
        let mut packaged = source::load_template(&frame.packaged, self.client)?;
        let built = source::load_template(&frame.built, self.client)?;

        let mut deployed = match source::fetch_deployed_template(self.client, &frame.stack_name) {
            Ok(template) => template,
            Err(SyncError::NotFound(what)) => {
                tracing::info!(
                    "stack {}: no deployed template ({what}); full sync required",
                    frame.stack_name
                );
                return Ok(SkipVerdict::Indeterminate(format!(
                    "no deployed template: {what}"
                )));
            }
            Err(err) => return Err(err),
        };

        // Child locators must be read before sanitization strips them.
        let nested = collect_nested_refs(&built, &packaged);

        let no_links = BTreeSet::new();
        let code_synced = sanitize_template(&mut packaged, &no_links, Some(&built));
        sanitize_template(&mut deployed, &no_links, None);

        if packaged != deployed {
            tracing::debug!(
                "stack {}: template divergence\n{}",
                frame.stack_name,
                render_divergence(&deployed, &packaged)
            );
            return Ok(SkipVerdict::Diverged);
        }

        if frame.locally_authored {
            for logical_id in &code_synced {
                let stack_like = built
                    .get(logical_id)
                    .map(|r| r.kind.is_stack_like())
                    .unwrap_or(false);
                // Stack-like resources recurse instead of code-syncing.
                if !stack_like {
                    self.code_sync_resources.insert(frame.prefix.join(logical_id));
                }
            }
        }

        for child in nested {
            match self.plan_child(frame, &child)? {
                ChildPlan::Recurse(child_frame) => frames.push(child_frame),
                ChildPlan::Settled(SkipVerdict::Skippable) => {}
                ChildPlan::Settled(verdict) => return Ok(verdict),
            }
        }

        Ok(SkipVerdict::Skippable)
    }

    /// Decide how a nested stack / linked application contributes to the
    /// overall verdict: either by value (repository descriptors) or by a
    /// recursive frame of its own.
    fn plan_child(&self, frame: &Frame, child: &NestedRef) -> Result<ChildPlan, SyncError> {
        // Repository descriptors cannot recurse: the nested template is not
        // locally authored, so skip eligibility is identity of the
        // descriptor across built and packaged.
        let descriptor_shaped = matches!(child.built_location, Some(Value::Object(_)))
            || matches!(child.packaged_location, Some(Value::Object(_)));
        if descriptor_shaped {
            return if child.built_location == child.packaged_location {
                Ok(ChildPlan::Settled(SkipVerdict::Skippable))
            } else {
                tracing::debug!(
                    "stack {}: linked application {} references a different repository entry",
                    frame.stack_name,
                    child.logical_id
                );
                Ok(ChildPlan::Settled(SkipVerdict::Diverged))
            };
        }

        let (Some(Value::String(built_loc)), Some(Value::String(packaged_loc))) =
            (&child.built_location, &child.packaged_location)
        else {
            return Ok(ChildPlan::Settled(SkipVerdict::Indeterminate(format!(
                "nested resource {} has no template locator",
                child.logical_id
            ))));
        };

        let physical_id = match self
            .client
            .describe_stack_resource(&frame.stack_name, &child.logical_id)
        {
            Ok(id) => id,
            // Child stack not created yet — the parent has not reached a
            // stable state; same sanctioned signal as a missing template.
            Err(SyncError::NotFound(what)) => {
                return Ok(ChildPlan::Settled(SkipVerdict::Indeterminate(format!(
                    "nested stack {} not deployed: {what}",
                    child.logical_id
                ))));
            }
            Err(err) => return Err(err),
        };

        let built = TemplateLocator::parse(built_loc);
        let locally_authored = frame.locally_authored && built.is_local();
        Ok(ChildPlan::Recurse(Frame {
            stack_name: StackName::from(physical_id),
            built,
            packaged: TemplateLocator::parse(packaged_loc),
            prefix: frame.prefix.join(&child.logical_id),
            locally_authored,
        }))
    }
}

enum ChildPlan {
    Recurse(Frame),
    Settled(SkipVerdict),
}

/// Capture the location fields of every stack-like resource present in the
/// built template, paired with the packaged copy.
fn collect_nested_refs(built: &Template, packaged: &Template) -> Vec<NestedRef> {
    built
        .iter()
        .filter(|(_, resource)| resource.kind.is_stack_like())
        .map(|(logical_id, resource)| {
            let field = location_field(&resource.kind);
            NestedRef {
                logical_id: logical_id.clone(),
                built_location: resource.properties.get(field).cloned(),
                packaged_location: packaged
                    .get(logical_id)
                    .and_then(|r| r.properties.get(field))
                    .cloned(),
            }
        })
        .collect()
}

fn location_field(kind: &ResourceKind) -> &'static str {
    match kind {
        ResourceKind::ServerlessApplication => "Location",
        _ => "TemplateURL",
    }
}

fn render_divergence(deployed: &Template, packaged: &Template) -> String {
    let deployed_json = serde_json::to_string_pretty(deployed).unwrap_or_default();
    let packaged_json = serde_json::to_string_pretty(packaged).unwrap_or_default();
    TextDiff::from_lines(&deployed_json, &packaged_json)
        .unified_diff()
        .header("deployed", "packaged")
        .context_radius(3)
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
