use crate::descriptor::SessionDescriptor;

/// Operation a session asks the HAL to begin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonRequest {
    Enroll {
        hardware_auth_token: Vec<u8>,
        timeout_secs: u32,
    },
    Authenticate {
        operation_id: u64,
    },
    Remove {
        /// 0 removes every template in the group
        biometric_id: i32,
    },
    Enumerate,
}

impl DaemonRequest {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Enroll { .. } => "enroll",
            Self::Authenticate { .. } => "authenticate",
            Self::Remove { .. } => "remove",
            Self::Enumerate => "enumerate",
        }
    }
}

/// Wrapper around the HAL daemon.
///
/// Shared by every session multiplexed onto the same hardware; the external
/// dispatcher guarantees at most one operation is in flight. Status codes are
/// `0` on success and an opaque platform error otherwise.
pub trait BiometricDaemon: Send + Sync {
    /// Begin `request` on behalf of the session described by `descriptor`
    fn start(&self, descriptor: &SessionDescriptor, request: &DaemonRequest) -> i32;

    /// Ask the HAL to abort the in-flight operation
    fn stop(&self, initiated_by_client: bool) -> i32;
}
