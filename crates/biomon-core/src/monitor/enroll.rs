use super::variant::{ClientKind, ClientVariant, VariantScope};
use crate::config::MonitorConfig;
use crate::daemon::DaemonRequest;
use crate::descriptor::BiometricIdentifier;
use crate::filter::AcquireFilter;

/// Enrolls a new template; finishes when the HAL reports no remaining steps
#[derive(Debug, Clone)]
pub struct EnrollClient {
    hardware_auth_token: Vec<u8>,
    timeout_secs: u32,
    filter: AcquireFilter,
}

impl EnrollClient {
    #[must_use]
    pub fn new(hardware_auth_token: Vec<u8>, timeout_secs: u32, filter: AcquireFilter) -> Self {
        Self {
            hardware_auth_token,
            timeout_secs,
            filter,
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig, hardware_auth_token: Vec<u8>) -> Self {
        Self::new(
            hardware_auth_token,
            config.enroll.timeout_secs,
            config.enroll_filter(),
        )
    }
}

impl ClientVariant for EnrollClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Enroll
    }

    fn daemon_request(&self) -> DaemonRequest {
        DaemonRequest::Enroll {
            hardware_auth_token: self.hardware_auth_token.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    fn acquire_filter(&self) -> Option<&AcquireFilter> {
        Some(&self.filter)
    }

    fn on_enroll_result(
        &mut self,
        scope: &VariantScope<'_>,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> bool {
        let group_id = scope.descriptor().group_id();
        if identifier.group_id != group_id {
            log::warn!(
                "{}: groupId != getGroupId(), groupId: {} getGroupId(): {group_id}",
                scope.log_tag(),
                identifier.group_id
            );
        }
        if remaining == 0 {
            log::info!(
                "{}: Enrollment finished for user {} (owner={})",
                scope.log_tag(),
                scope.descriptor().target_user_id(),
                scope.descriptor().owner()
            );
        }

        scope.signal_success();
        match scope.deliver(|l| l.on_enroll_result(identifier, remaining)) {
            Ok(()) => remaining == 0,
            Err(e) => {
                log::warn!("{}: Failed to notify EnrollResult: {e}", scope.log_tag());
                true
            }
        }
    }
}
