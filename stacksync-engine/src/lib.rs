//! # stacksync-engine
//!
//! Decision engine for the fast deployment loop: reconciles the
//! last-deployed template against the freshly built and packaged templates
//! and decides whether a full infrastructure deployment is required, or
//! whether the change touches only code/artifact locations and can be
//! applied directly to running resources.
//!
//! Call [`executor::InfraSyncExecutor::execute_infra_sync`] to run the full
//! build → package → decide → deploy|skip pipeline, or
//! [`reconcile::Reconciler::auto_skip`] for the bare skip decision.

pub mod client;
pub mod error;
pub mod executor;
pub mod policy;
pub mod reconcile;
pub mod sanitize;
pub mod source;
pub mod state;

pub use client::CloudClient;
pub use error::SyncError;
pub use executor::{
    BuildStage, DeployStage, InfraSyncExecutor, InfraSyncResult, PackageStage, SyncTarget,
};
pub use policy::{FullSyncReason, SyncDecision, SYNC_FLOW_THRESHOLD};
pub use reconcile::{Reconciler, SkipVerdict};
pub use source::TemplateLocator;
pub use state::{FileSyncState, SyncStateStore};
