use super::variant::{ClientKind, ClientVariant, VariantScope};
use crate::daemon::DaemonRequest;
use crate::descriptor::BiometricIdentifier;

/// Lists the templates the HAL holds for the session's group
#[derive(Debug, Clone, Default)]
pub struct EnumerateClient;

impl EnumerateClient {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ClientVariant for EnumerateClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Enumerate
    }

    fn daemon_request(&self) -> DaemonRequest {
        DaemonRequest::Enumerate
    }

    fn on_enumeration_result(
        &mut self,
        scope: &VariantScope<'_>,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> bool {
        match scope.deliver(|l| l.on_enumerated(identifier, remaining)) {
            Ok(()) => remaining == 0,
            Err(e) => {
                log::warn!("{}: Failed to notify Enumerated: {e}", scope.log_tag());
                true
            }
        }
    }
}
