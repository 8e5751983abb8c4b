use super::variant::{ClientKind, ClientVariant, VariantScope};
use crate::config::MonitorConfig;
use crate::constants::ERROR_LOCKOUT;
use crate::daemon::DaemonRequest;
use crate::descriptor::BiometricIdentifier;
use crate::filter::AcquireFilter;

/// Authenticates the user.
///
/// An accepted match finishes the session. A rejection keeps it running so
/// the user can retry, until `max_failed_attempts` rejections trigger a
/// lockout error.
#[derive(Debug, Clone)]
pub struct AuthenticateClient {
    operation_id: u64,
    filter: AcquireFilter,
    max_failed_attempts: u32,
    failed_attempts: u32,
}

impl AuthenticateClient {
    #[must_use]
    pub fn new(operation_id: u64, filter: AcquireFilter, max_failed_attempts: u32) -> Self {
        Self {
            operation_id,
            filter,
            max_failed_attempts,
            failed_attempts: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig, operation_id: u64) -> Self {
        Self::new(
            operation_id,
            config.authenticate_filter(),
            config.authenticate.max_failed_attempts,
        )
    }

    #[must_use]
    pub const fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    #[must_use]
    pub const fn is_locked_out(&self) -> bool {
        self.max_failed_attempts > 0 && self.failed_attempts >= self.max_failed_attempts
    }

    /// Count stays pinned at `u32::MAX` when lockout is disabled
    fn record_rejection(&mut self) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
    }
}

impl ClientVariant for AuthenticateClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Authenticate
    }

    fn daemon_request(&self) -> DaemonRequest {
        DaemonRequest::Authenticate {
            operation_id: self.operation_id,
        }
    }

    fn acquire_filter(&self) -> Option<&AcquireFilter> {
        Some(&self.filter)
    }

    fn on_authenticated(
        &mut self,
        scope: &VariantScope<'_>,
        identifier: &BiometricIdentifier,
        authenticated: bool,
        token: &[u8],
    ) -> bool {
        if authenticated {
            log::info!(
                "{}: Authenticated biometric {} for owner {}",
                scope.log_tag(),
                identifier.biometric_id,
                scope.descriptor().owner()
            );
            scope.signal_success();
            if let Err(e) = scope.deliver(|l| l.on_authentication_succeeded(identifier, token)) {
                log::warn!("{}: Failed to notify Authenticated: {e}", scope.log_tag());
            }
            return true;
        }

        self.record_rejection();
        log::debug!(
            "{}: Authentication rejected ({} of {})",
            scope.log_tag(),
            self.failed_attempts,
            self.max_failed_attempts
        );
        scope.signal_failure();
        let device_id = scope.descriptor().hardware_device_id();
        if let Err(e) = scope.deliver(|l| l.on_authentication_failed(device_id)) {
            log::warn!("{}: Failed to notify AuthenticationFailed: {e}", scope.log_tag());
            return true;
        }

        if self.is_locked_out() {
            log::warn!(
                "{}: Too many failed attempts for user {}, locking out",
                scope.log_tag(),
                scope.descriptor().target_user_id()
            );
            scope.report_error(self.kind(), device_id, ERROR_LOCKOUT, 0);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_count_saturates_without_lockout() {
        let mut client = AuthenticateClient::new(1, AcquireFilter::new(6), 0);
        client.failed_attempts = u32::MAX - 1;

        client.record_rejection();
        client.record_rejection();

        assert_eq!(client.failed_attempts(), u32::MAX);
        assert!(!client.is_locked_out());
    }

    #[test]
    fn test_lockout_reached_at_limit() {
        let mut client = AuthenticateClient::new(1, AcquireFilter::new(6), 2);
        client.record_rejection();
        assert!(!client.is_locked_out());
        client.record_rejection();
        assert!(client.is_locked_out());
    }
}
