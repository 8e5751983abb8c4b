use super::variant::{ClientKind, ClientVariant, VariantScope};
use crate::daemon::DaemonRequest;
use crate::descriptor::BiometricIdentifier;

/// Removes one template, or every template in the group when `biometric_id` is 0
#[derive(Debug, Clone)]
pub struct RemoveClient {
    biometric_id: i32,
}

impl RemoveClient {
    #[must_use]
    pub const fn new(biometric_id: i32) -> Self {
        Self { biometric_id }
    }
}

impl ClientVariant for RemoveClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Remove
    }

    fn daemon_request(&self) -> DaemonRequest {
        DaemonRequest::Remove {
            biometric_id: self.biometric_id,
        }
    }

    fn on_removed(
        &mut self,
        scope: &VariantScope<'_>,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> bool {
        log::debug!(
            "{}: Removed biometric {}, remaining {remaining}",
            scope.log_tag(),
            identifier.biometric_id
        );
        match scope.deliver(|l| l.on_removed(identifier, remaining)) {
            Ok(()) => remaining == 0,
            Err(e) => {
                log::warn!("{}: Failed to notify Removed: {e}", scope.log_tag());
                true
            }
        }
    }
}
