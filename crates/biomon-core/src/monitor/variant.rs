use super::ClientContext;
use crate::daemon::DaemonRequest;
use crate::descriptor::{BiometricIdentifier, SessionDescriptor};
use crate::error::ListenerError;
use crate::filter::AcquireFilter;
use crate::listener::ServiceListener;
use serde::{Deserialize, Serialize};

/// Hardware action a session performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Enroll,
    Authenticate,
    Remove,
    Enumerate,
}

impl ClientKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enroll => "enroll",
            Self::Authenticate => "authenticate",
            Self::Remove => "remove",
            Self::Enumerate => "enumerate",
        }
    }
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a variant callback may touch while the monitor lock is held
pub struct VariantScope<'a> {
    context: &'a ClientContext,
    descriptor: &'a SessionDescriptor,
    listener: Option<&'a dyn ServiceListener>,
}

impl<'a> VariantScope<'a> {
    pub(crate) fn new(
        context: &'a ClientContext,
        descriptor: &'a SessionDescriptor,
        listener: Option<&'a dyn ServiceListener>,
    ) -> Self {
        Self {
            context,
            descriptor,
            listener,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &SessionDescriptor {
        self.descriptor
    }

    #[must_use]
    pub const fn context(&self) -> &ClientContext {
        self.context
    }

    #[must_use]
    pub const fn log_tag(&self) -> &'static str {
        self.context.constants.log_tag()
    }

    #[must_use]
    pub const fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Run `send` against the listener, if one is still attached.
    ///
    /// # Errors
    ///
    /// Propagates the listener's delivery failure
    pub fn deliver(
        &self,
        send: impl FnOnce(&dyn ServiceListener) -> Result<(), ListenerError>,
    ) -> Result<(), ListenerError> {
        self.listener.map_or(Ok(()), send)
    }

    pub fn signal_success(&self) {
        self.context
            .haptics
            .signal_success(self.descriptor.target_user_id());
    }

    pub fn signal_failure(&self) {
        self.context
            .haptics
            .signal_failure(self.descriptor.target_user_id());
    }

    /// Record an error with the metrics sink and forward it with the
    /// session cookie. Delivery failures are logged, never propagated.
    pub fn report_error(&self, kind: ClientKind, device_id: u64, error: i32, vendor_code: i32) {
        self.context.metrics.log_on_error(
            kind,
            error,
            vendor_code,
            self.descriptor.target_user_id(),
        );
        let cookie = self.descriptor.cookie();
        if let Err(e) = self.deliver(|l| l.on_error(device_id, error, vendor_code, cookie)) {
            log::warn!("{}: Failed to invoke sendError: {e}", self.log_tag());
        }
    }

    fn unexpected(&self, kind: ClientKind, callback: &str) -> bool {
        log::warn!(
            "{}: {callback}() called for {kind} client (owner={})",
            self.log_tag(),
            self.descriptor.owner()
        );
        true
    }
}

/// Per-action behaviour plugged into the shared session state machine.
///
/// Each capability callback returns `true` once the session is finished.
/// Callbacks a variant does not expect are logged and finish the session.
pub trait ClientVariant: Send + 'static {
    fn kind(&self) -> ClientKind;

    /// Request handed to the daemon by `start()`
    fn daemon_request(&self) -> DaemonRequest;

    /// Ignore lists for acquisition messages; `None` ignores nothing
    fn acquire_filter(&self) -> Option<&AcquireFilter> {
        None
    }

    fn on_enroll_result(
        &mut self,
        scope: &VariantScope<'_>,
        _identifier: &BiometricIdentifier,
        _remaining: i32,
    ) -> bool {
        scope.unexpected(self.kind(), "on_enroll_result")
    }

    fn on_authenticated(
        &mut self,
        scope: &VariantScope<'_>,
        _identifier: &BiometricIdentifier,
        _authenticated: bool,
        _token: &[u8],
    ) -> bool {
        scope.unexpected(self.kind(), "on_authenticated")
    }

    fn on_removed(
        &mut self,
        scope: &VariantScope<'_>,
        _identifier: &BiometricIdentifier,
        _remaining: i32,
    ) -> bool {
        scope.unexpected(self.kind(), "on_removed")
    }

    fn on_enumeration_result(
        &mut self,
        scope: &VariantScope<'_>,
        _identifier: &BiometricIdentifier,
        _remaining: i32,
    ) -> bool {
        scope.unexpected(self.kind(), "on_enumeration_result")
    }
}
