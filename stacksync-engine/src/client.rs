//! Control-plane surface consumed by the reconciler.
//!
//! Authentication and session setup belong to the collaborator that
//! implements this trait; the engine only issues blocking request/response
//! calls and imposes no timeout or cancellation contract.

use stacksync_core::StackName;

use crate::SyncError;

/// Blocking control-plane and object-storage client.
pub trait CloudClient {
    /// `GetTemplate` — the currently deployed template body for a stack.
    ///
    /// Implementations must map 404-class control-plane responses (stack or
    /// template absent) to [`SyncError::NotFound`]; any other failure is a
    /// [`SyncError::Client`].
    fn get_template(&self, stack_name: &StackName) -> Result<String, SyncError>;

    /// `DescribeStackResource` — the control-plane-assigned physical id of
    /// a deployed resource, required to query a nested stack's own
    /// deployed template.
    fn describe_stack_resource(
        &self,
        stack_name: &StackName,
        logical_id: &str,
    ) -> Result<String, SyncError>;

    /// Object-storage `GetObject` — raw bytes of a remote template.
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, SyncError>;
}
