//! Session monitor: the per-request state machine between one client and
//! the biometric HAL.
//!
//! The external dispatcher constructs a [`ClientMonitor`], calls
//! [`SessionMonitor::start`], then forwards every HAL callback into it. Each
//! callback returns `true` once the session is finished and the dispatcher
//! may advance to the next queued session. Client death bypasses the
//! dispatcher and cancels the operation through the [`DeathRecipient`] hook.
//!
//! Every monitor serializes HAL callbacks, `stop()`, death notification and
//! `destroy()` behind one lock. Listeners and daemons are invoked while that
//! lock is held and must not call back into the same monitor.

mod authenticate;
mod enroll;
mod enumerate;
mod remove;
mod variant;


pub use authenticate::AuthenticateClient;
pub use enroll::EnrollClient;
pub use enumerate::EnumerateClient;
pub use remove::RemoveClient;
pub use variant::{ClientKind, ClientVariant, VariantScope};

use crate::constants::{BiometricConstants, ACQUIRED_GOOD, ERROR_EALREADY, ERROR_HW_UNAVAILABLE};
use crate::daemon::BiometricDaemon;
use crate::death::{ClientToken, DeathRecipient, LinkId};
use crate::descriptor::{BiometricIdentifier, SessionDescriptor};
use crate::error::TokenError;
use crate::haptics::HapticGate;
use crate::listener::ServiceListener;
use crate::metrics::{LogMetricsSink, MetricsSink};
use crate::power::{NoopUserActivity, UserActivity};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Lifecycle of a monitor. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Constructed, death watch armed, HAL not contacted yet
    Created,
    /// The HAL accepted the request
    Running,
    /// A callback returned a finished verdict, or the monitor was destroyed
    Terminated,
}

/// Monotonic termination flags; never reset once set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminationState {
    already_cancelled: bool,
    already_done: bool,
}

impl TerminationState {
    /// A cancellation request reached the HAL
    #[must_use]
    pub const fn already_cancelled(&self) -> bool {
        self.already_cancelled
    }

    /// A terminal verdict was handed to the dispatcher
    #[must_use]
    pub const fn already_done(&self) -> bool {
        self.already_done
    }
}

/// Collaborators shared by every session on one piece of hardware
#[derive(Clone)]
pub struct ClientContext {
    pub daemon: Arc<dyn BiometricDaemon>,
    pub metrics: Arc<dyn MetricsSink>,
    pub haptics: HapticGate,
    pub user_activity: Arc<dyn UserActivity>,
    pub constants: BiometricConstants,
}

impl ClientContext {
    /// Context that logs metrics, has no vibrator and ignores user activity
    #[must_use]
    pub fn new(daemon: Arc<dyn BiometricDaemon>, constants: BiometricConstants) -> Self {
        Self {
            daemon,
            metrics: Arc::new(LogMetricsSink),
            haptics: HapticGate::disabled(),
            user_activity: Arc::new(NoopUserActivity),
            constants,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn with_haptics(mut self, haptics: HapticGate) -> Self {
        self.haptics = haptics;
        self
    }

    #[must_use]
    pub fn with_user_activity(mut self, user_activity: Arc<dyn UserActivity>) -> Self {
        self.user_activity = user_activity;
        self
    }
}

/// The monitor contract the dispatcher holds polymorphically
pub trait SessionMonitor: Send + Sync {
    fn kind(&self) -> ClientKind;

    fn descriptor(&self) -> &SessionDescriptor;

    fn cookie(&self) -> i32 {
        self.descriptor().cookie()
    }

    fn is_already_done(&self) -> bool;

    /// Contact the HAL to start the operation.
    ///
    /// Returns 0 on success or the driver's error code; after a nonzero
    /// return no callbacks will arrive for this request.
    fn start(&self) -> i32;

    /// Ask the HAL to abort the operation. The terminal verdict still
    /// arrives through the callbacks, typically `on_error`.
    fn stop(&self, initiated_by_client: bool) -> i32;

    /// An image was acquired. Never finishes the session unless the
    /// listener channel is broken.
    fn on_acquired(&self, acquired_info: i32, vendor_code: i32) -> bool;

    /// The HAL reported an error. Always finishes the session.
    fn on_error(&self, device_id: u64, error: i32, vendor_code: i32) -> bool;

    fn on_enroll_result(&self, identifier: &BiometricIdentifier, remaining: i32) -> bool;

    fn on_authenticated(
        &self,
        identifier: &BiometricIdentifier,
        authenticated: bool,
        token: &[u8],
    ) -> bool;

    fn on_removed(&self, identifier: &BiometricIdentifier, remaining: i32) -> bool;

    fn on_enumeration_result(&self, identifier: &BiometricIdentifier, remaining: i32) -> bool;

    /// Release the death watch and the listener. Safe to call repeatedly.
    fn destroy(&self);
}

struct MonitorState<V> {
    variant: V,
    phase: MonitorPhase,
    termination: TerminationState,
    token: Option<Arc<ClientToken>>,
    link: Option<LinkId>,
    listener: Option<Arc<dyn ServiceListener>>,
    destroyed: bool,
}

/// Shared session state machine parameterized by its hardware action
pub struct ClientMonitor<V: ClientVariant> {
    context: ClientContext,
    descriptor: SessionDescriptor,
    state: Mutex<MonitorState<V>>,
}

impl<V: ClientVariant> ClientMonitor<V> {
    /// Build a monitor and link it to `token`'s death notification.
    #[must_use]
    pub fn new(
        context: ClientContext,
        descriptor: SessionDescriptor,
        variant: V,
        token: Option<Arc<ClientToken>>,
        listener: Option<Arc<dyn ServiceListener>>,
    ) -> Arc<Self> {
        let monitor = Arc::new(Self {
            context,
            descriptor,
            state: Mutex::new(MonitorState {
                variant,
                phase: MonitorPhase::Created,
                termination: TerminationState::default(),
                token: token.clone(),
                link: None,
                listener,
                destroyed: false,
            }),
        });

        if let Some(token) = token {
            let weak: Weak<Self> = Arc::downgrade(&monitor);
            let recipient: Weak<dyn DeathRecipient> = weak;
            match token.link_to_death(recipient) {
                Ok(link) => monitor.lock_state().link = Some(link),
                Err(e) => log::warn!("{}: caught error in link_to_death: {e}", monitor.log_tag()),
            }
        }
        monitor
    }

    #[must_use]
    pub const fn log_tag(&self) -> &'static str {
        self.context.constants.log_tag()
    }

    #[must_use]
    pub const fn context(&self) -> &ClientContext {
        &self.context
    }

    #[must_use]
    pub fn phase(&self) -> MonitorPhase {
        self.lock_state().phase
    }

    #[must_use]
    pub fn termination(&self) -> TerminationState {
        self.lock_state().termination
    }

    #[must_use]
    pub fn listener(&self) -> Option<Arc<dyn ServiceListener>> {
        self.lock_state().listener.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<Arc<ClientToken>> {
        self.lock_state().token.clone()
    }

    /// Inspect the variant's own bookkeeping
    pub fn with_variant<R>(&self, inspect: impl FnOnce(&V) -> R) -> R {
        inspect(&self.lock_state().variant)
    }

    /// Handle client death. With `clear_listener` false the listener stays
    /// attached so a final error can still be delivered.
    pub fn client_died_internal(&self, clear_listener: bool) {
        let mut state = self.lock_state();
        if state.destroyed {
            log::debug!(
                "{}: Client died after destroy, nothing to cancel (owner={})",
                self.log_tag(),
                self.descriptor.owner()
            );
            return;
        }
        log::error!(
            "{}: Client died, cancelling client (owner={})",
            self.log_tag(),
            self.descriptor.owner()
        );
        self.stop_locked(&mut state, false);
        state.token = None;
        state.link = None;
        if clear_listener {
            state.listener = None;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MonitorState<V>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("{}: recovering poisoned monitor lock", self.log_tag());
            poisoned.into_inner()
        })
    }

    fn stop_locked(&self, state: &mut MonitorState<V>, initiated_by_client: bool) -> i32 {
        if state.phase == MonitorPhase::Terminated {
            log::debug!("{}: stop() after session terminated, ignoring", self.log_tag());
            return 0;
        }
        if state.termination.already_cancelled {
            log::warn!("{}: stop(): already cancelled", self.log_tag());
            return 0;
        }
        let result = self.context.daemon.stop(initiated_by_client);
        if result != 0 {
            log::warn!("{}: stopHal failed, result={result}", self.log_tag());
            return result;
        }
        log::debug!(
            "{}: client {} is no longer running (initiated_by_client={initiated_by_client})",
            self.log_tag(),
            self.descriptor.owner()
        );
        state.termination.already_cancelled = true;
        0
    }

    /// Evaluate a HAL callback against live state and record a finished
    /// verdict. Callbacks after termination are logged and dropped.
    fn dispatch(
        &self,
        callback: &str,
        handle: impl FnOnce(&mut V, &VariantScope<'_>) -> bool,
    ) -> bool {
        let mut state = self.lock_state();
        if state.termination.already_done {
            log::error!(
                "{}: {callback}() after terminal verdict, dropping (owner={})",
                self.log_tag(),
                self.descriptor.owner()
            );
            return false;
        }
        if state.phase == MonitorPhase::Terminated {
            log::warn!(
                "{}: {callback}() after destroy, dropping (owner={})",
                self.log_tag(),
                self.descriptor.owner()
            );
            return false;
        }

        let MonitorState {
            variant, listener, ..
        } = &mut *state;
        let scope = VariantScope::new(&self.context, &self.descriptor, listener.as_deref());
        let finished = handle(variant, &scope);

        if finished {
            state.termination.already_done = true;
            state.phase = MonitorPhase::Terminated;
        }
        finished
    }
}

impl<V: ClientVariant> SessionMonitor for ClientMonitor<V> {
    fn kind(&self) -> ClientKind {
        self.lock_state().variant.kind()
    }

    fn descriptor(&self) -> &SessionDescriptor {
        &self.descriptor
    }

    fn is_already_done(&self) -> bool {
        self.lock_state().termination.already_done
    }

    fn start(&self) -> i32 {
        let mut state = self.lock_state();
        if state.phase != MonitorPhase::Created {
            log::warn!(
                "{}: start() called in phase {:?}, ignoring",
                self.log_tag(),
                state.phase
            );
            return ERROR_EALREADY;
        }

        let request = state.variant.daemon_request();
        let result = self.context.daemon.start(&self.descriptor, &request);
        if result != 0 {
            log::warn!(
                "{}: startHal {} failed, result={result}",
                self.log_tag(),
                request.name()
            );
            return result;
        }
        log::debug!(
            "{}: {} started for user {} (owner={})",
            self.log_tag(),
            request.name(),
            self.descriptor.target_user_id(),
            self.descriptor.owner()
        );
        state.phase = MonitorPhase::Running;
        0
    }

    fn stop(&self, initiated_by_client: bool) -> i32 {
        let mut state = self.lock_state();
        self.stop_locked(&mut state, initiated_by_client)
    }

    fn on_acquired(&self, acquired_info: i32, vendor_code: i32) -> bool {
        let user_id = self.descriptor.target_user_id();
        let device_id = self.descriptor.hardware_device_id();
        self.dispatch("on_acquired", |variant, scope| {
            self.context
                .metrics
                .log_on_acquired(variant.kind(), acquired_info, vendor_code, user_id);
            log::debug!("{}: Acquired: {acquired_info} {vendor_code}", self.log_tag());

            let ignored = variant
                .acquire_filter()
                .is_some_and(|filter| filter.should_ignore(acquired_info, vendor_code));
            let finished = if ignored {
                log::debug!(
                    "{}: Ignoring message: {acquired_info} {vendor_code}",
                    self.log_tag()
                );
                false
            } else {
                match scope.deliver(|l| l.on_acquired(device_id, acquired_info, vendor_code)) {
                    Ok(()) => false,
                    Err(e) => {
                        log::warn!("{}: Failed to invoke sendAcquired: {e}", self.log_tag());
                        true
                    }
                }
            };

            // Good scans keep the device awake
            if acquired_info == ACQUIRED_GOOD {
                self.context.user_activity.notify_user_activity(user_id);
            }
            finished
        })
    }

    fn on_error(&self, device_id: u64, error: i32, vendor_code: i32) -> bool {
        self.dispatch("on_error", |variant, scope| {
            scope.report_error(variant.kind(), device_id, error, vendor_code);
            true
        })
    }

    fn on_enroll_result(&self, identifier: &BiometricIdentifier, remaining: i32) -> bool {
        self.dispatch("on_enroll_result", |variant, scope| {
            variant.on_enroll_result(scope, identifier, remaining)
        })
    }

    fn on_authenticated(
        &self,
        identifier: &BiometricIdentifier,
        authenticated: bool,
        token: &[u8],
    ) -> bool {
        self.dispatch("on_authenticated", |variant, scope| {
            variant.on_authenticated(scope, identifier, authenticated, token)
        })
    }

    fn on_removed(&self, identifier: &BiometricIdentifier, remaining: i32) -> bool {
        self.dispatch("on_removed", |variant, scope| {
            variant.on_removed(scope, identifier, remaining)
        })
    }

    fn on_enumeration_result(&self, identifier: &BiometricIdentifier, remaining: i32) -> bool {
        self.dispatch("on_enumeration_result", |variant, scope| {
            variant.on_enumeration_result(scope, identifier, remaining)
        })
    }

    fn destroy(&self) {
        let mut state = self.lock_state();
        if let Some(token) = state.token.take() {
            let unlinked = state
                .link
                .take()
                .map_or(Err(TokenError::NotLinked), |link| token.unlink_to_death(link));
            if let Err(e) = unlinked {
                log::error!(
                    "{}: destroy(): {}: {e}",
                    self.log_tag(),
                    self.descriptor.owner()
                );
            }
        }
        state.listener = None;
        if !state.destroyed {
            state.destroyed = true;
            state.phase = MonitorPhase::Terminated;
            log::debug!(
                "{}: destroyed {} client (owner={})",
                self.log_tag(),
                state.variant.kind(),
                self.descriptor.owner()
            );
        }
    }
}

impl<V: ClientVariant> DeathRecipient for ClientMonitor<V> {
    fn client_died(&self) {
        self.client_died_internal(true);
    }
}

impl<V: ClientVariant> Drop for ClientMonitor<V> {
    /// A monitor still holding its client token was never destroyed. Report
    /// the session as failed so the client sees a terminal event.
    fn drop(&mut self) {
        let Self {
            context,
            descriptor,
            state,
        } = self;
        let state = state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(token) = state.token.take() else {
            return;
        };
        log::warn!(
            "{}: removing leaked reference for {}",
            context.constants.log_tag(),
            descriptor.owner()
        );
        if let Some(link) = state.link.take() {
            if let Err(e) = token.unlink_to_death(link) {
                log::debug!(
                    "{}: unlink on leaked reference for {}: {e}",
                    context.constants.log_tag(),
                    descriptor.owner()
                );
            }
        }
        if state.termination.already_done {
            return;
        }

        let scope = VariantScope::new(context, descriptor, state.listener.as_deref());
        scope.report_error(
            state.variant.kind(),
            descriptor.hardware_device_id(),
            ERROR_HW_UNAVAILABLE,
            0,
        );
        state.termination.already_done = true;
        state.phase = MonitorPhase::Terminated;
    }
}

impl<V: ClientVariant> std::fmt::Debug for ClientMonitor<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("ClientMonitor")
            .field("kind", &state.variant.kind())
            .field("descriptor", &self.descriptor)
            .field("phase", &state.phase)
            .field("termination", &state.termination)
            .finish_non_exhaustive()
    }
}
