//! Full-sync policy gates layered on the reconciler verdict.
//!
//! Gate precedence:
//! 1. Time gate (no recorded full sync, or the last one too old)
//! 2. Reconciler verdict (diverged / indeterminate)
//! 3. Resource-count threshold

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::reconcile::SkipVerdict;

/// Above this many code-syncable resources, a single full deployment beats
/// that many independent code syncs.
pub const SYNC_FLOW_THRESHOLD: usize = 7;

/// Maximum age of the last full sync before one is forced. Bounds template
/// drift the diff algorithm cannot see (e.g. out-of-band console edits).
pub const FORCE_SYNC_INTERVAL_DAYS: i64 = 7;

pub fn force_sync_interval() -> Duration {
    Duration::days(FORCE_SYNC_INTERVAL_DAYS)
}

/// Why a full infrastructure sync was (or would be) executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullSyncReason {
    /// The caller explicitly requested a full sync.
    Forced,
    /// No full sync has ever been recorded for this stack.
    NeverSynced,
    /// The last full sync is older than [`FORCE_SYNC_INTERVAL_DAYS`].
    IntervalElapsed,
    /// The reconciler found a difference outside the field-strip table.
    TemplateDiverged,
    /// The reconciler could not compare (e.g. nothing deployed yet).
    Indeterminate(String),
    /// More code-sync candidates than [`SYNC_FLOW_THRESHOLD`].
    ThresholdExceeded(usize),
}

impl fmt::Display for FullSyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "full sync explicitly requested"),
            Self::NeverSynced => write!(f, "no prior full sync recorded"),
            Self::IntervalElapsed => write!(
                f,
                "last full sync older than {FORCE_SYNC_INTERVAL_DAYS} days"
            ),
            Self::TemplateDiverged => write!(f, "templates diverge beyond code locations"),
            Self::Indeterminate(reason) => write!(f, "comparison indeterminate: {reason}"),
            Self::ThresholdExceeded(count) => write!(
                f,
                "{count} code-sync resources exceed threshold {SYNC_FLOW_THRESHOLD}"
            ),
        }
    }
}

/// The policy outcome for one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    FullSync(FullSyncReason),
    SkipDeploy,
}

/// Time gate: forces a full sync when no prior full sync is recorded or the
/// last one is older than the interval, regardless of any diff outcome.
pub fn time_gate(
    last_full_sync: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<FullSyncReason> {
    match last_full_sync {
        None => Some(FullSyncReason::NeverSynced),
        Some(at) if now.signed_duration_since(at) > force_sync_interval() => {
            Some(FullSyncReason::IntervalElapsed)
        }
        Some(_) => None,
    }
}

/// Map the reconciler outcome to a decision, once the time gate has passed.
///
/// The threshold check deliberately runs over the fully-recursed resource
/// set rather than short-circuiting recursion early.
pub fn decide(verdict: &SkipVerdict, code_sync_count: usize) -> SyncDecision {
    match verdict {
        SkipVerdict::Diverged => SyncDecision::FullSync(FullSyncReason::TemplateDiverged),
        SkipVerdict::Indeterminate(reason) => {
            SyncDecision::FullSync(FullSyncReason::Indeterminate(reason.clone()))
        }
        SkipVerdict::Skippable if code_sync_count > SYNC_FLOW_THRESHOLD => {
            SyncDecision::FullSync(FullSyncReason::ThresholdExceeded(code_sync_count))
        }
        SkipVerdict::Skippable => SyncDecision::SkipDeploy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_gate_forces_when_never_synced() {
        assert_eq!(
            time_gate(None, Utc::now()),
            Some(FullSyncReason::NeverSynced)
        );
    }

    #[test]
    fn time_gate_forces_after_interval() {
        let now = Utc::now();
        let stale = now - Duration::days(8);
        assert_eq!(
            time_gate(Some(stale), now),
            Some(FullSyncReason::IntervalElapsed)
        );
    }

    #[test]
    fn time_gate_passes_inside_interval() {
        let now = Utc::now();
        let recent = now - Duration::days(4);
        assert_eq!(time_gate(Some(recent), now), None);
    }

    #[test]
    fn exactly_at_interval_does_not_force() {
        let now = Utc::now();
        let boundary = now - force_sync_interval();
        assert_eq!(time_gate(Some(boundary), now), None);
    }

    #[test]
    fn diverged_verdict_requires_full_sync() {
        assert_eq!(
            decide(&SkipVerdict::Diverged, 0),
            SyncDecision::FullSync(FullSyncReason::TemplateDiverged)
        );
    }

    #[test]
    fn indeterminate_verdict_requires_full_sync() {
        let verdict = SkipVerdict::Indeterminate("no deployed template".to_owned());
        match decide(&verdict, 0) {
            SyncDecision::FullSync(FullSyncReason::Indeterminate(_)) => {}
            other => panic!("expected indeterminate full sync, got {other:?}"),
        }
    }

    #[test]
    fn threshold_boundary() {
        assert_eq!(
            decide(&SkipVerdict::Skippable, SYNC_FLOW_THRESHOLD),
            SyncDecision::SkipDeploy
        );
        assert_eq!(
            decide(&SkipVerdict::Skippable, SYNC_FLOW_THRESHOLD + 1),
            SyncDecision::FullSync(FullSyncReason::ThresholdExceeded(SYNC_FLOW_THRESHOLD + 1))
        );
    }

    #[test]
    fn reasons_render_for_logs() {
        assert!(FullSyncReason::NeverSynced.to_string().contains("no prior"));
        assert!(FullSyncReason::ThresholdExceeded(9)
            .to_string()
            .contains("9"));
    }
}
