//! Infra sync orchestration.
//!
//! ## `execute_infra_sync` — linear pipeline
//!
//! 1. Build: `build.set_up()`, `build.run()` — fatal on failure.
//! 2. Package: `package.run()` — fatal on failure.
//! 3. Decide: time gate, then reconciler verdict, then threshold
//!    (skipped entirely when the caller forces a full sync).
//! 4. Full sync: `deploy.run()`, persist the sync timestamp.
//!    Skip: report the code-sync resource set; deploy is not invoked.
//!
//! No back-edges, no retries at this layer — retries belong to the
//! build/package/deploy collaborators.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Utc;

use stacksync_core::{ResourceIdentifier, StackName};

use crate::client::CloudClient;
use crate::policy::{self, FullSyncReason, SyncDecision};
use crate::reconcile::Reconciler;
use crate::source::TemplateLocator;
use crate::state::SyncStateStore;
use crate::SyncError;

// ---------------------------------------------------------------------------
// Collaborator contracts
// ---------------------------------------------------------------------------

/// Produces the built template and artifacts on local storage.
pub trait BuildStage {
    fn set_up(&mut self) -> Result<(), SyncError>;
    fn run(&mut self) -> Result<(), SyncError>;
}

/// Relocates artifacts to remote storage and rewrites the built template's
/// location fields into the packaged template.
pub trait PackageStage {
    fn run(&mut self) -> Result<(), SyncError>;
}

/// Applies a full stack deployment from the packaged template.
pub trait DeployStage {
    fn run(&mut self) -> Result<(), SyncError>;
}

// ---------------------------------------------------------------------------
// Target and result
// ---------------------------------------------------------------------------

/// What to sync: the stack plus where the build and package stages leave
/// their template outputs.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub stack_name: StackName,
    pub built_template: PathBuf,
    pub packaged_template: PathBuf,
}

/// Outcome of one orchestration run. Produced fresh every run; never
/// persisted.
///
/// `code_sync_resources` is populated only when `executed` is false — a
/// full deployment supersedes any partial-sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraSyncResult {
    pub executed: bool,
    pub code_sync_resources: BTreeSet<ResourceIdentifier>,
    pub full_sync_reason: Option<FullSyncReason>,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Sequences build → package → decide → deploy | skip.
pub struct InfraSyncExecutor<'c, C, B, P, D, S>
where
    C: CloudClient,
    B: BuildStage,
    P: PackageStage,
    D: DeployStage,
    S: SyncStateStore,
{
    client: &'c C,
    build: B,
    package: P,
    deploy: D,
    sync_state: S,
    target: SyncTarget,
}

impl<'c, C, B, P, D, S> InfraSyncExecutor<'c, C, B, P, D, S>
where
    C: CloudClient,
    B: BuildStage,
    P: PackageStage,
    D: DeployStage,
    S: SyncStateStore,
{
    pub fn new(
        client: &'c C,
        build: B,
        package: P,
        deploy: D,
        sync_state: S,
        target: SyncTarget,
    ) -> Self {
        Self {
            client,
            build,
            package,
            deploy,
            sync_state,
            target,
        }
    }

    /// Run the full pipeline for one sync attempt.
    ///
    /// With `force_infra_sync` the decision step is bypassed and a full
    /// deployment always runs. Errors from any stage abort before the
    /// deployment is attempted, leaving the remote stack untouched.
    pub fn execute_infra_sync(
        &mut self,
        force_infra_sync: bool,
    ) -> Result<InfraSyncResult, SyncError> {
        self.build.set_up()?;
        self.build.run()?;
        self.package.run()?;

        let now = Utc::now();
        let (decision, code_sync_resources) = if force_infra_sync {
            (
                SyncDecision::FullSync(FullSyncReason::Forced),
                BTreeSet::new(),
            )
        } else {
            self.decide()?
        };

        match decision {
            SyncDecision::FullSync(reason) => {
                tracing::info!(
                    "executing full infra sync for {}: {reason}",
                    self.target.stack_name
                );
                self.deploy.run()?;
                self.sync_state.record_full_sync(now)?;
                Ok(InfraSyncResult {
                    executed: true,
                    code_sync_resources: BTreeSet::new(),
                    full_sync_reason: Some(reason),
                })
            }
            SyncDecision::SkipDeploy => {
                tracing::info!(
                    "skipping infra sync for {}: {} resource(s) eligible for code sync",
                    self.target.stack_name,
                    code_sync_resources.len()
                );
                Ok(InfraSyncResult {
                    executed: false,
                    code_sync_resources,
                    full_sync_reason: None,
                })
            }
        }
    }

    /// The skip decision: time gate first (it forces a full sync regardless
    /// of any diff outcome, so the control-plane reads are skipped), then
    /// reconciliation, then the resource-count threshold.
    fn decide(&self) -> Result<(SyncDecision, BTreeSet<ResourceIdentifier>), SyncError> {
        let now = Utc::now();
        if let Some(reason) = policy::time_gate(self.sync_state.last_full_sync()?, now) {
            return Ok((SyncDecision::FullSync(reason), BTreeSet::new()));
        }

        let built = TemplateLocator::Local(self.target.built_template.clone());
        let packaged = TemplateLocator::Local(self.target.packaged_template.clone());
        let mut reconciler = Reconciler::new(self.client);
        let verdict = reconciler.auto_skip(&built, &packaged, &self.target.stack_name)?;
        let resources = reconciler.into_code_sync_resources();
        let decision = policy::decide(&verdict, resources.len());
        Ok((decision, resources))
    }
}
