//! Simulated collaborators for replaying a session outside a device:
//! a HAL that answers with scripted status codes, and listener, vibrator
//! and power sinks that record what the monitor emitted.

use biomon_core::{
    BiometricDaemon, BiometricIdentifier, DaemonRequest, HapticEffect, HapticUsage,
    ListenerError, ServiceListener, SessionDescriptor, UserActivity, Vibrator,
};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One observable step of a replay, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayLine {
    HalStart { request: String, status: i32 },
    HalStop { initiated_by_client: bool, status: i32 },
    Delivered { event: Delivery },
    DeliveryFailed { event: Delivery },
    Haptic { effect: String },
    UserActivity { user_id: i32 },
    Verdict { callback: String, finished: bool },
    Status { operation: String, status: i32 },
    ClientDied { notified: usize },
    Destroyed,
}

/// An event the monitor forwarded to its listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Delivery {
    Acquired { device_id: u64, info: i32, vendor: i32 },
    Error { device_id: u64, error: i32, vendor: i32, cookie: i32 },
    EnrollResult { biometric_id: i32, remaining: i32 },
    AuthenticationSucceeded { biometric_id: i32, token_len: usize },
    AuthenticationFailed { device_id: u64 },
    Removed { biometric_id: i32, remaining: i32 },
    Enumerated { biometric_id: i32, remaining: i32 },
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquired { device_id, info, vendor } => {
                write!(f, "acquired(device={device_id}, info={info}, vendor={vendor})")
            }
            Self::Error { device_id, error, vendor, cookie } => write!(
                f,
                "error(device={device_id}, error={error}, vendor={vendor}, cookie={cookie})"
            ),
            Self::EnrollResult { biometric_id, remaining } => {
                write!(f, "enroll_result(id={biometric_id}, remaining={remaining})")
            }
            Self::AuthenticationSucceeded { biometric_id, token_len } => {
                write!(f, "authentication_succeeded(id={biometric_id}, token={token_len} bytes)")
            }
            Self::AuthenticationFailed { device_id } => {
                write!(f, "authentication_failed(device={device_id})")
            }
            Self::Removed { biometric_id, remaining } => {
                write!(f, "removed(id={biometric_id}, remaining={remaining})")
            }
            Self::Enumerated { biometric_id, remaining } => {
                write!(f, "enumerated(id={biometric_id}, remaining={remaining})")
            }
        }
    }
}

impl fmt::Display for ReplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HalStart { request, status } => write!(f, "hal start {request} -> {status}"),
            Self::HalStop { initiated_by_client, status } => {
                write!(f, "hal stop (client={initiated_by_client}) -> {status}")
            }
            Self::Delivered { event } => write!(f, "  > {event}"),
            Self::DeliveryFailed { event } => write!(f, "  x {event} (channel broken)"),
            Self::Haptic { effect } => write!(f, "  ~ haptic {effect}"),
            Self::UserActivity { user_id } => write!(f, "  ~ user activity for user {user_id}"),
            Self::Verdict { callback, finished } => {
                let verdict = if *finished { "finished" } else { "continue" };
                write!(f, "{callback} -> {verdict}")
            }
            Self::Status { operation, status } => write!(f, "{operation} -> {status}"),
            Self::ClientDied { notified } => {
                write!(f, "client died ({notified} recipient(s) notified)")
            }
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Shared, ordered record of everything a replay produced
#[derive(Debug, Clone, Default)]
pub struct ReplayLog(Arc<Mutex<Vec<ReplayLine>>>);

impl ReplayLog {
    pub fn push(&self, line: ReplayLine) {
        self.lock().push(line);
    }

    #[must_use]
    pub fn lines(&self) -> Vec<ReplayLine> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReplayLine>> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// HAL stand-in that answers start and stop with fixed status codes
pub struct SimulatedHal {
    start_status: i32,
    stop_status: i32,
    log: ReplayLog,
}

impl SimulatedHal {
    #[must_use]
    pub const fn new(start_status: i32, stop_status: i32, log: ReplayLog) -> Self {
        Self {
            start_status,
            stop_status,
            log,
        }
    }
}

impl BiometricDaemon for SimulatedHal {
    fn start(&self, descriptor: &SessionDescriptor, request: &DaemonRequest) -> i32 {
        log::debug!(
            "Simulated HAL start {} for user {} (group {})",
            request.name(),
            descriptor.target_user_id(),
            descriptor.group_id()
        );
        self.log.push(ReplayLine::HalStart {
            request: request.name().to_string(),
            status: self.start_status,
        });
        self.start_status
    }

    fn stop(&self, initiated_by_client: bool) -> i32 {
        self.log.push(ReplayLine::HalStop {
            initiated_by_client,
            status: self.stop_status,
        });
        self.stop_status
    }
}

/// Listener that records deliveries and can break its channel on cue
pub struct ScriptedListener {
    log: ReplayLog,
    fail_after: Option<usize>,
    delivered: AtomicUsize,
}

impl ScriptedListener {
    #[must_use]
    pub const fn new(log: ReplayLog, fail_after: Option<usize>) -> Self {
        Self {
            log,
            fail_after,
            delivered: AtomicUsize::new(0),
        }
    }

    fn deliver(&self, event: Delivery) -> Result<(), ListenerError> {
        if let Some(limit) = self.fail_after {
            if self.delivered.load(Ordering::SeqCst) >= limit {
                self.log.push(ReplayLine::DeliveryFailed { event });
                return Err(ListenerError::ChannelClosed);
            }
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        self.log.push(ReplayLine::Delivered { event });
        Ok(())
    }
}

impl ServiceListener for ScriptedListener {
    fn on_acquired(
        &self,
        device_id: u64,
        acquired_info: i32,
        vendor_code: i32,
    ) -> Result<(), ListenerError> {
        self.deliver(Delivery::Acquired {
            device_id,
            info: acquired_info,
            vendor: vendor_code,
        })
    }

    fn on_error(
        &self,
        device_id: u64,
        error: i32,
        vendor_code: i32,
        cookie: i32,
    ) -> Result<(), ListenerError> {
        self.deliver(Delivery::Error {
            device_id,
            error,
            vendor: vendor_code,
            cookie,
        })
    }

    fn on_enroll_result(
        &self,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> Result<(), ListenerError> {
        self.deliver(Delivery::EnrollResult {
            biometric_id: identifier.biometric_id,
            remaining,
        })
    }

    fn on_authentication_succeeded(
        &self,
        identifier: &BiometricIdentifier,
        token: &[u8],
    ) -> Result<(), ListenerError> {
        self.deliver(Delivery::AuthenticationSucceeded {
            biometric_id: identifier.biometric_id,
            token_len: token.len(),
        })
    }

    fn on_authentication_failed(&self, device_id: u64) -> Result<(), ListenerError> {
        self.deliver(Delivery::AuthenticationFailed { device_id })
    }

    fn on_removed(
        &self,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> Result<(), ListenerError> {
        self.deliver(Delivery::Removed {
            biometric_id: identifier.biometric_id,
            remaining,
        })
    }

    fn on_enumerated(
        &self,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> Result<(), ListenerError> {
        self.deliver(Delivery::Enumerated {
            biometric_id: identifier.biometric_id,
            remaining,
        })
    }
}

pub struct RecordingVibrator {
    log: ReplayLog,
}

impl RecordingVibrator {
    #[must_use]
    pub const fn new(log: ReplayLog) -> Self {
        Self { log }
    }
}

impl Vibrator for RecordingVibrator {
    fn vibrate(&self, effect: HapticEffect, usage: HapticUsage) {
        log::debug!("Vibrate {effect:?} ({usage:?})");
        self.log.push(ReplayLine::Haptic {
            effect: format!("{effect:?}"),
        });
    }
}

pub struct RecordingUserActivity {
    log: ReplayLog,
}

impl RecordingUserActivity {
    #[must_use]
    pub const fn new(log: ReplayLog) -> Self {
        Self { log }
    }
}

impl UserActivity for RecordingUserActivity {
    fn notify_user_activity(&self, user_id: i32) {
        self.log.push(ReplayLine::UserActivity { user_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_breaks_after_limit() {
        let log = ReplayLog::default();
        let listener = ScriptedListener::new(log.clone(), Some(1));

        assert!(listener.on_authentication_failed(1).is_ok());
        assert!(matches!(
            listener.on_authentication_failed(1),
            Err(ListenerError::ChannelClosed)
        ));

        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert!(matches!(lines[0], ReplayLine::Delivered { .. }));
        assert!(matches!(lines[1], ReplayLine::DeliveryFailed { .. }));
    }

    #[test]
    fn test_hal_records_calls() {
        let log = ReplayLog::default();
        let hal = SimulatedHal::new(0, 3, log.clone());
        let descriptor = SessionDescriptor::new(1, 0, 0, false, "test", 0);

        assert_eq!(hal.start(&descriptor, &DaemonRequest::Enumerate), 0);
        assert_eq!(hal.stop(true), 3);
        assert_eq!(
            log.lines(),
            vec![
                ReplayLine::HalStart {
                    request: DaemonRequest::Enumerate.name().to_string(),
                    status: 0,
                },
                ReplayLine::HalStop {
                    initiated_by_client: true,
                    status: 3,
                },
            ]
        );
    }

    #[test]
    fn test_json_line_shape() {
        let line = ReplayLine::Verdict {
            callback: "on_error".to_string(),
            finished: true,
        };
        let json = serde_json::to_string(&line).unwrap();
        assert_eq!(
            json,
            r#"{"type":"verdict","callback":"on_error","finished":true}"#
        );
    }

    #[test]
    fn test_text_rendering() {
        let line = ReplayLine::Delivered {
            event: Delivery::Acquired {
                device_id: 1,
                info: 0,
                vendor: 0,
            },
        };
        assert_eq!(line.to_string(), "  > acquired(device=1, info=0, vendor=0)");
    }
}
