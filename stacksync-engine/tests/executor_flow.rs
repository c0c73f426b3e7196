//! Orchestration-level behavior: stage ordering, decision gates, and sync
//! state persistence.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use stacksync_core::{ResourceIdentifier, StackName};
use stacksync_engine::{
    BuildStage, CloudClient, DeployStage, FileSyncState, FullSyncReason, InfraSyncExecutor,
    PackageStage, SyncError, SyncStateStore, SyncTarget,
};

// ---------------------------------------------------------------------------
// Stage and client stubs
// ---------------------------------------------------------------------------

/// Shared call log across all stage stubs, in invocation order.
#[derive(Default, Clone)]
struct StageLog(Rc<RefCell<Vec<&'static str>>>);

impl StageLog {
    fn push(&self, call: &'static str) {
        self.0.borrow_mut().push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }
}

struct RecordingBuild(StageLog);

impl BuildStage for RecordingBuild {
    fn set_up(&mut self) -> Result<(), SyncError> {
        self.0.push("build.set_up");
        Ok(())
    }

    fn run(&mut self) -> Result<(), SyncError> {
        self.0.push("build.run");
        Ok(())
    }
}

struct RecordingPackage(StageLog);

impl PackageStage for RecordingPackage {
    fn run(&mut self) -> Result<(), SyncError> {
        self.0.push("package.run");
        Ok(())
    }
}

struct RecordingDeploy(StageLog);

impl DeployStage for RecordingDeploy {
    fn run(&mut self) -> Result<(), SyncError> {
        self.0.push("deploy.run");
        Ok(())
    }
}

/// Control plane serving only deployed template bodies.
#[derive(Default)]
struct StubClient {
    deployed: HashMap<String, String>,
}

impl StubClient {
    fn with_deployed(mut self, stack: &str, body: &str) -> Self {
        self.deployed.insert(stack.to_owned(), body.to_owned());
        self
    }
}

impl CloudClient for StubClient {
    fn get_template(&self, stack_name: &StackName) -> Result<String, SyncError> {
        self.deployed
            .get(&stack_name.0)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("stack {stack_name}")))
    }

    fn describe_stack_resource(&self, _: &StackName, _: &str) -> Result<String, SyncError> {
        unreachable!("no nested stacks in these scenarios")
    }

    fn get_object(&self, _: &str, _: &str) -> Result<Vec<u8>, SyncError> {
        unreachable!("no object-store templates in these scenarios")
    }
}

/// Client that must never be consulted — proves a gate short-circuited
/// before reconciliation.
struct UntouchedClient;

impl CloudClient for UntouchedClient {
    fn get_template(&self, _: &StackName) -> Result<String, SyncError> {
        unreachable!("reconciliation must not run")
    }

    fn describe_stack_resource(&self, _: &StackName, _: &str) -> Result<String, SyncError> {
        unreachable!("reconciliation must not run")
    }

    fn get_object(&self, _: &str, _: &str) -> Result<Vec<u8>, SyncError> {
        unreachable!("reconciliation must not run")
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn function_body(code_uri: &str) -> String {
    format!(
        r#"{{"Resources": {{"Function": {{"Type": "AWS::Serverless::Function",
            "Properties": {{"CodeUri": "{code_uri}"}}}}}}}}"#
    )
}

fn many_functions_body(count: usize, code_uri: &str) -> String {
    let resources: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#""Function{i}": {{"Type": "AWS::Serverless::Function",
                    "Properties": {{"CodeUri": "{code_uri}"}}}}"#
            )
        })
        .collect();
    format!(r#"{{"Resources": {{{}}}}}"#, resources.join(","))
}

fn make_target(dir: &Path, built_body: &str, packaged_body: &str) -> SyncTarget {
    let built_template = dir.join("built.json");
    let packaged_template = dir.join("packaged.json");
    fs::write(&built_template, built_body).expect("write built");
    fs::write(&packaged_template, packaged_body).expect("write packaged");
    SyncTarget {
        stack_name: StackName::from("app"),
        built_template,
        packaged_template,
    }
}

fn recent_state(home: &Path) -> FileSyncState {
    let state = FileSyncState::at(home, StackName::from("app"));
    state
        .record_full_sync(Utc::now() - Duration::days(1))
        .expect("seed state");
    state
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn skip_path_runs_no_deploy_and_keeps_state() {
    let dir = TempDir::new().expect("tempdir");
    let home = TempDir::new().expect("home");
    let target = make_target(
        dir.path(),
        &function_body("src/"),
        &function_body("s3://b/new"),
    );
    let client = StubClient::default().with_deployed("app", &function_body("s3://b/old"));
    let state = recent_state(home.path());
    let seeded = state.last_full_sync().expect("read state");

    let log = StageLog::default();
    let mut executor = InfraSyncExecutor::new(
        &client,
        RecordingBuild(log.clone()),
        RecordingPackage(log.clone()),
        RecordingDeploy(log.clone()),
        state.clone(),
        target,
    );
    let result = executor.execute_infra_sync(false).expect("execute");

    assert!(!result.executed);
    assert_eq!(result.full_sync_reason, None);
    let expected: BTreeSet<ResourceIdentifier> = [ResourceIdentifier::from("Function")].into();
    assert_eq!(result.code_sync_resources, expected);
    assert_eq!(log.calls(), vec!["build.set_up", "build.run", "package.run"]);
    assert_eq!(state.last_full_sync().expect("read state"), seeded);
}

#[test]
fn template_divergence_deploys_and_records_state() {
    let dir = TempDir::new().expect("tempdir");
    let home = TempDir::new().expect("home");
    let target = make_target(
        dir.path(),
        &function_body("src/"),
        &function_body("s3://b/new"),
    );
    let diverged = r#"{"Resources": {"Function": {"Type": "AWS::Serverless::Function",
        "Properties": {"CodeUri": "s3://b/old", "MemorySize": 512}}}}"#;
    let client = StubClient::default().with_deployed("app", diverged);
    let state = recent_state(home.path());
    let before = Utc::now();

    let log = StageLog::default();
    let mut executor = InfraSyncExecutor::new(
        &client,
        RecordingBuild(log.clone()),
        RecordingPackage(log.clone()),
        RecordingDeploy(log.clone()),
        state.clone(),
        target,
    );
    let result = executor.execute_infra_sync(false).expect("execute");

    assert!(result.executed);
    assert_eq!(
        result.full_sync_reason,
        Some(FullSyncReason::TemplateDiverged)
    );
    assert!(result.code_sync_resources.is_empty());
    assert_eq!(
        log.calls(),
        vec!["build.set_up", "build.run", "package.run", "deploy.run"]
    );
    let recorded = state
        .last_full_sync()
        .expect("read state")
        .expect("state recorded");
    assert!(recorded >= before);
}

#[test]
fn threshold_exceeded_prefers_full_sync() {
    let dir = TempDir::new().expect("tempdir");
    let home = TempDir::new().expect("home");
    let target = make_target(
        dir.path(),
        &many_functions_body(8, "src/"),
        &many_functions_body(8, "s3://b/new"),
    );
    let client = StubClient::default().with_deployed("app", &many_functions_body(8, "s3://b/old"));
    let state = recent_state(home.path());

    let log = StageLog::default();
    let mut executor = InfraSyncExecutor::new(
        &client,
        RecordingBuild(log.clone()),
        RecordingPackage(log.clone()),
        RecordingDeploy(log.clone()),
        state,
        target,
    );
    let result = executor.execute_infra_sync(false).expect("execute");

    assert!(result.executed);
    assert_eq!(
        result.full_sync_reason,
        Some(FullSyncReason::ThresholdExceeded(8))
    );
    assert!(result.code_sync_resources.is_empty());
    assert!(log.calls().contains(&"deploy.run"));
}

#[test]
fn stale_sync_state_forces_full_sync_without_reconciling() {
    let dir = TempDir::new().expect("tempdir");
    let home = TempDir::new().expect("home");
    let target = make_target(
        dir.path(),
        &function_body("src/"),
        &function_body("s3://b/new"),
    );
    let state = FileSyncState::at(home.path(), StackName::from("app"));
    state
        .record_full_sync(Utc::now() - Duration::days(8))
        .expect("seed state");

    let log = StageLog::default();
    let mut executor = InfraSyncExecutor::new(
        &UntouchedClient,
        RecordingBuild(log.clone()),
        RecordingPackage(log.clone()),
        RecordingDeploy(log.clone()),
        state.clone(),
        target,
    );
    let result = executor.execute_infra_sync(false).expect("execute");

    assert!(result.executed);
    assert_eq!(
        result.full_sync_reason,
        Some(FullSyncReason::IntervalElapsed)
    );
    assert!(log.calls().contains(&"deploy.run"));
    let recorded = state
        .last_full_sync()
        .expect("read state")
        .expect("state recorded");
    assert!(Utc::now() - recorded < Duration::minutes(1));
}

#[test]
fn never_synced_stack_forces_full_sync() {
    let dir = TempDir::new().expect("tempdir");
    let home = TempDir::new().expect("home");
    let target = make_target(
        dir.path(),
        &function_body("src/"),
        &function_body("s3://b/new"),
    );
    let state = FileSyncState::at(home.path(), StackName::from("app"));

    let log = StageLog::default();
    let mut executor = InfraSyncExecutor::new(
        &UntouchedClient,
        RecordingBuild(log.clone()),
        RecordingPackage(log.clone()),
        RecordingDeploy(log.clone()),
        state,
        target,
    );
    let result = executor.execute_infra_sync(false).expect("execute");

    assert!(result.executed);
    assert_eq!(result.full_sync_reason, Some(FullSyncReason::NeverSynced));
}

#[test]
fn force_flag_bypasses_every_gate() {
    // Recent state and a would-be-skippable template pair; the flag alone
    // must drive the full sync, without consulting the control plane.
    let dir = TempDir::new().expect("tempdir");
    let home = TempDir::new().expect("home");
    let target = make_target(
        dir.path(),
        &function_body("src/"),
        &function_body("s3://b/new"),
    );
    let state = recent_state(home.path());

    let log = StageLog::default();
    let mut executor = InfraSyncExecutor::new(
        &UntouchedClient,
        RecordingBuild(log.clone()),
        RecordingPackage(log.clone()),
        RecordingDeploy(log.clone()),
        state,
        target,
    );
    let result = executor.execute_infra_sync(true).expect("execute");

    assert!(result.executed);
    assert_eq!(result.full_sync_reason, Some(FullSyncReason::Forced));
    assert!(result.code_sync_resources.is_empty());
    assert!(log.calls().contains(&"deploy.run"));
}

#[test]
fn build_failure_aborts_before_deploy() {
    struct FailingBuild(StageLog);
    impl BuildStage for FailingBuild {
        fn set_up(&mut self) -> Result<(), SyncError> {
            self.0.push("build.set_up");
            Ok(())
        }
        fn run(&mut self) -> Result<(), SyncError> {
            Err(SyncError::Client("compiler exited with status 1".into()))
        }
    }

    let dir = TempDir::new().expect("tempdir");
    let home = TempDir::new().expect("home");
    let target = make_target(
        dir.path(),
        &function_body("src/"),
        &function_body("s3://b/new"),
    );
    let state = recent_state(home.path());
    let seeded = state.last_full_sync().expect("read state");

    let log = StageLog::default();
    let mut executor = InfraSyncExecutor::new(
        &UntouchedClient,
        FailingBuild(log.clone()),
        RecordingPackage(log.clone()),
        RecordingDeploy(log.clone()),
        state.clone(),
        target,
    );
    let err = executor.execute_infra_sync(false).unwrap_err();

    assert!(matches!(err, SyncError::Client(_)));
    assert_eq!(log.calls(), vec!["build.set_up"]);
    assert_eq!(state.last_full_sync().expect("read state"), seeded);
}
