//! Replay command: drive one session monitor through a scripted HAL trace

use crate::script::{ReplayScript, ScriptEvent, SessionSpec};
use crate::sim::{
    RecordingUserActivity, RecordingVibrator, ReplayLine, ReplayLog, ScriptedListener,
    SimulatedHal,
};
use anyhow::{Context, Result};
use biomon_core::{
    process_alive, AuthenticateClient, BiometricIdentifier, ClientContext, ClientKind,
    ClientMonitor, ClientToken, ClientVariant, CookieAllocator, EnrollClient, EnumerateClient,
    HapticGate, InMemoryPreferences, LogMetricsSink, MonitorConfig, RemoveClient,
    ServiceListener, SessionDescriptor, SessionMonitor, Vibrator,
};
use clap::ValueEnum;
use std::path::Path;
use std::sync::Arc;

static COOKIES: CookieAllocator = CookieAllocator::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    /// One JSON object per line
    Json,
}

/// Replay `script_path` and print every step the monitor took
///
/// # Errors
///
/// Returns an error if the script or configuration cannot be loaded
pub fn replay_command(
    script_path: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
    owner_pid: Option<u32>,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let script = ReplayScript::load(script_path)?;

    let token = script.session.with_token.then(|| {
        Arc::new(owner_pid.map_or_else(ClientToken::new, ClientToken::for_process))
    });
    match (&token, owner_pid) {
        (Some(_), Some(pid)) => log::info!("Checking owner process {pid} before each event"),
        (None, Some(pid)) => log::warn!("Session has no client token, not watching pid {pid}"),
        _ => {}
    }

    let lines = run_script(&script, &config, token, owner_pid);

    for line in &lines {
        match format {
            OutputFormat::Text => println!("{line}"),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string(line).context("Failed to encode replay line")?
            ),
        }
    }
    Ok(())
}

/// Run the script to completion and return what happened, in order.
///
/// With an `owner_pid`, the owner is probed before every event and its exit
/// is delivered as a client death at that point in the script. The session
/// is destroyed at the end if the script did not do so itself.
pub fn run_script(
    script: &ReplayScript,
    config: &MonitorConfig,
    token: Option<Arc<ClientToken>>,
    owner_pid: Option<u32>,
) -> Vec<ReplayLine> {
    let log = ReplayLog::default();
    let session = &script.session;

    let vibrator: Arc<dyn Vibrator> = Arc::new(RecordingVibrator::new(log.clone()));
    let haptics = HapticGate::new(Some(vibrator), Arc::new(InMemoryPreferences::new()))
        .with_defaults(config.haptics.success_default, config.haptics.error_default);
    let context = ClientContext::new(
        Arc::new(SimulatedHal::new(
            script.hal.start_status,
            script.hal.stop_status,
            log.clone(),
        )),
        config.constants(),
    )
    .with_metrics(Arc::new(LogMetricsSink))
    .with_haptics(haptics)
    .with_user_activity(Arc::new(RecordingUserActivity::new(log.clone())));

    let listener: Arc<dyn ServiceListener> =
        Arc::new(ScriptedListener::new(log.clone(), script.listener.fail_after));
    let monitor = build_monitor(session, config, context, token.clone(), listener);
    log::info!(
        "Replaying {} session for user {} ({} events)",
        session.variant,
        session.user_id,
        script.events.len()
    );

    let status = monitor.start();
    log.push(ReplayLine::Status {
        operation: "start".to_string(),
        status,
    });

    let mut destroyed = false;
    for event in &script.events {
        check_owner(token.as_deref(), owner_pid, &log);
        match event {
            ScriptEvent::Stop {
                initiated_by_client,
            } => {
                let status = monitor.stop(*initiated_by_client);
                log.push(ReplayLine::Status {
                    operation: "stop".to_string(),
                    status,
                });
            }
            ScriptEvent::ClientDied => {
                let notified = token.as_ref().map_or_else(
                    || {
                        log::warn!("client_died event without a client token");
                        0
                    },
                    |token| token.notify_death(),
                );
                log.push(ReplayLine::ClientDied { notified });
            }
            ScriptEvent::Destroy => {
                monitor.destroy();
                destroyed = true;
                log.push(ReplayLine::Destroyed);
            }
            callback => {
                if let Some((name, finished)) =
                    deliver_callback(monitor.as_ref(), session, callback)
                {
                    log.push(ReplayLine::Verdict {
                        callback: name.to_string(),
                        finished,
                    });
                }
            }
        }
    }

    if !destroyed {
        monitor.destroy();
        log.push(ReplayLine::Destroyed);
    }
    drop(monitor);
    log.lines()
}

fn check_owner(token: Option<&ClientToken>, owner_pid: Option<u32>, log: &ReplayLog) {
    let (Some(token), Some(pid)) = (token, owner_pid) else {
        return;
    };
    if token.is_alive() && !process_alive(pid) {
        log::info!("Owner process {pid} exited, notifying death recipients");
        let notified = token.notify_death();
        log.push(ReplayLine::ClientDied { notified });
    }
}

/// Authenticate sessions without a scripted cookie get a fresh one
fn session_cookie(session: &SessionSpec) -> i32 {
    if session.cookie == 0 && session.variant == ClientKind::Authenticate {
        let cookie = COOKIES.allocate();
        log::debug!("Allocated cookie {cookie} for authenticate session");
        cookie
    } else {
        session.cookie
    }
}

fn build_monitor(
    session: &SessionSpec,
    config: &MonitorConfig,
    context: ClientContext,
    token: Option<Arc<ClientToken>>,
    listener: Arc<dyn ServiceListener>,
) -> Arc<dyn SessionMonitor> {
    let descriptor = SessionDescriptor::new(
        session.device_id,
        session.user_id,
        session.group_id,
        session.restricted,
        session.owner.clone(),
        session_cookie(session),
    );
    match session.variant {
        ClientKind::Enroll => erase(ClientMonitor::new(
            context,
            descriptor,
            EnrollClient::from_config(config, session.hardware_auth_token.clone()),
            token,
            Some(listener),
        )),
        ClientKind::Authenticate => erase(ClientMonitor::new(
            context,
            descriptor,
            AuthenticateClient::from_config(config, session.operation_id),
            token,
            Some(listener),
        )),
        ClientKind::Remove => erase(ClientMonitor::new(
            context,
            descriptor,
            RemoveClient::new(session.biometric_id),
            token,
            Some(listener),
        )),
        ClientKind::Enumerate => erase(ClientMonitor::new(
            context,
            descriptor,
            EnumerateClient::new(),
            token,
            Some(listener),
        )),
    }
}

fn erase<V: ClientVariant>(monitor: Arc<ClientMonitor<V>>) -> Arc<dyn SessionMonitor> {
    monitor
}

/// Feed a HAL callback event to the monitor. Lifecycle events yield `None`.
fn deliver_callback(
    monitor: &dyn SessionMonitor,
    session: &SessionSpec,
    event: &ScriptEvent,
) -> Option<(&'static str, bool)> {
    let identifier = |biometric_id: i32| {
        BiometricIdentifier::new(biometric_id, session.group_id, session.device_id)
    };
    let verdict = match event {
        ScriptEvent::Acquired { info, vendor } => {
            ("on_acquired", monitor.on_acquired(*info, *vendor))
        }
        ScriptEvent::Error {
            error,
            vendor,
            device_id,
        } => (
            "on_error",
            monitor.on_error(device_id.unwrap_or(session.device_id), *error, *vendor),
        ),
        ScriptEvent::EnrollResult {
            biometric_id,
            remaining,
        } => (
            "on_enroll_result",
            monitor.on_enroll_result(&identifier(*biometric_id), *remaining),
        ),
        ScriptEvent::Authenticated {
            biometric_id,
            authenticated,
            token,
        } => (
            "on_authenticated",
            monitor.on_authenticated(&identifier(*biometric_id), *authenticated, token),
        ),
        ScriptEvent::Removed {
            biometric_id,
            remaining,
        } => (
            "on_removed",
            monitor.on_removed(&identifier(*biometric_id), *remaining),
        ),
        ScriptEvent::Enumerated {
            biometric_id,
            remaining,
        } => (
            "on_enumeration_result",
            monitor.on_enumeration_result(&identifier(*biometric_id), *remaining),
        ),
        ScriptEvent::Stop { .. } | ScriptEvent::ClientDied | ScriptEvent::Destroy => return None,
    };
    Some(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Delivery;
    use biomon_core::constants::{ERROR_CANCELED, ERROR_EALREADY, ERROR_HW_UNAVAILABLE};

    fn run(script: &str) -> Vec<ReplayLine> {
        let script = ReplayScript::parse(script).unwrap();
        let token = script.session.with_token.then(|| Arc::new(ClientToken::new()));
        run_script(&script, &MonitorConfig::default(), token, None)
    }

    fn verdicts(lines: &[ReplayLine]) -> Vec<(String, bool)> {
        lines
            .iter()
            .filter_map(|line| match line {
                ReplayLine::Verdict { callback, finished } => Some((callback.clone(), *finished)),
                _ => None,
            })
            .collect()
    }

    fn deliveries(lines: &[ReplayLine]) -> Vec<Delivery> {
        lines
            .iter()
            .filter_map(|line| match line {
                ReplayLine::Delivered { event } => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_successful_authentication() {
        let lines = run(r#"
[session]
variant = "authenticate"
user_id = 10

[[event]]
kind = "acquired"
info = 0

[[event]]
kind = "authenticated"
biometric_id = 3
authenticated = true
token = [1, 2, 3]
"#);

        assert_eq!(
            verdicts(&lines),
            vec![
                ("on_acquired".to_string(), false),
                ("on_authenticated".to_string(), true),
            ]
        );
        assert!(lines.contains(&ReplayLine::UserActivity { user_id: 10 }));
        assert!(lines.contains(&ReplayLine::Delivered {
            event: Delivery::AuthenticationSucceeded {
                biometric_id: 3,
                token_len: 3,
            }
        }));
        assert_eq!(lines.last(), Some(&ReplayLine::Destroyed));
    }

    #[test]
    fn test_events_after_error_are_dropped() {
        let lines = run(r#"
[session]
variant = "enumerate"
cookie = 7

[[event]]
kind = "error"
error = 5

[[event]]
kind = "enumerated"
biometric_id = 1
remaining = 0
"#);

        assert_eq!(
            verdicts(&lines),
            vec![
                ("on_error".to_string(), true),
                ("on_enumeration_result".to_string(), false),
            ]
        );
        assert_eq!(
            deliveries(&lines),
            vec![Delivery::Error {
                device_id: 1,
                error: ERROR_CANCELED,
                vendor: 0,
                cookie: 7,
            }]
        );
    }

    #[test]
    fn test_failed_start_reports_hal_status() {
        let lines = run(r#"
[session]
variant = "remove"
biometric_id = 4

[hal]
start_status = 1
"#);

        assert!(lines.contains(&ReplayLine::Status {
            operation: "start".to_string(),
            status: 1,
        }));
        assert!(!lines.iter().any(|line| matches!(
            line,
            ReplayLine::Status { status, .. } if *status == ERROR_EALREADY
        )));
    }

    #[test]
    fn test_client_death_stops_hal_once() {
        let lines = run(r#"
[session]
variant = "enroll"

[[event]]
kind = "client_died"

[[event]]
kind = "stop"

[[event]]
kind = "client_died"
"#);

        let stops = lines
            .iter()
            .filter(|line| matches!(line, ReplayLine::HalStop { .. }))
            .count();
        assert_eq!(stops, 1);
        assert!(lines.contains(&ReplayLine::HalStop {
            initiated_by_client: false,
            status: 0,
        }));
        assert!(lines.contains(&ReplayLine::ClientDied { notified: 1 }));
        assert!(lines.contains(&ReplayLine::ClientDied { notified: 0 }));
    }

    #[test]
    fn test_broken_listener_finishes_session() {
        let lines = run(r#"
[session]
variant = "authenticate"

[listener]
fail_after = 0

[[event]]
kind = "acquired"
info = 0
"#);

        assert_eq!(verdicts(&lines), vec![("on_acquired".to_string(), true)]);
        assert!(deliveries(&lines).is_empty());
    }

    #[test]
    fn test_explicit_destroy_is_not_repeated() {
        let lines = run(r#"
[session]
variant = "enumerate"
with_token = false

[[event]]
kind = "destroy"

[[event]]
kind = "enumerated"
biometric_id = 1
remaining = 0
"#);

        let destroys = lines
            .iter()
            .filter(|line| matches!(line, ReplayLine::Destroyed))
            .count();
        assert_eq!(destroys, 1);
        assert_eq!(
            verdicts(&lines),
            vec![("on_enumeration_result".to_string(), false)]
        );
        assert!(!deliveries(&lines).iter().any(|d| matches!(
            d,
            Delivery::Error { error, .. } if *error == ERROR_HW_UNAVAILABLE
        )));
    }

    #[test]
    fn test_authenticate_without_cookie_gets_one() {
        let lines = run(r#"
[session]
variant = "authenticate"

[[event]]
kind = "error"
error = 5
"#);

        let cookies: Vec<i32> = deliveries(&lines)
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Error { cookie, .. } => Some(cookie),
                _ => None,
            })
            .collect();
        assert_eq!(cookies.len(), 1);
        assert_ne!(cookies[0], 0);
    }

    #[test]
    fn test_non_authenticate_keeps_zero_cookie() {
        let lines = run(r#"
[session]
variant = "remove"

[[event]]
kind = "error"
error = 5
"#);

        assert!(deliveries(&lines)
            .iter()
            .any(|d| matches!(d, Delivery::Error { cookie: 0, .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exited_owner_cancels_before_first_event() {
        let mut child = tokio::process::Command::new("true").spawn().unwrap();
        let pid = child.id().unwrap();
        child.wait().await.unwrap();

        let script = ReplayScript::parse(
            r#"
[session]
variant = "enroll"

[[event]]
kind = "enroll_result"
biometric_id = 12
remaining = 2

[[event]]
kind = "enroll_result"
biometric_id = 12
remaining = 1
"#,
        )
        .unwrap();
        let token = Arc::new(ClientToken::for_process(pid));
        let lines = run_script(&script, &MonitorConfig::default(), Some(token.clone()), Some(pid));

        let stop = lines
            .iter()
            .position(|line| {
                *line
                    == ReplayLine::HalStop {
                        initiated_by_client: false,
                        status: 0,
                    }
            })
            .unwrap();
        let first_verdict = lines
            .iter()
            .position(|line| matches!(line, ReplayLine::Verdict { .. }))
            .unwrap();
        assert!(stop < first_verdict);
        assert!(!token.is_alive());
        assert_eq!(
            lines
                .iter()
                .filter(|line| matches!(line, ReplayLine::ClientDied { .. }))
                .count(),
            1
        );
        assert!(lines.contains(&ReplayLine::ClientDied { notified: 1 }));
    }

    #[test]
    fn test_live_owner_is_not_cancelled() {
        let script = ReplayScript::parse(
            "[session]\nvariant = \"enumerate\"\n[[event]]\nkind = \"enumerated\"\nbiometric_id = 1\nremaining = 1\n",
        )
        .unwrap();
        let pid = std::process::id();
        let token = Arc::new(ClientToken::for_process(pid));
        let lines = run_script(&script, &MonitorConfig::default(), Some(token.clone()), Some(pid));

        assert!(token.is_alive());
        assert!(!lines
            .iter()
            .any(|line| matches!(line, ReplayLine::ClientDied { .. } | ReplayLine::HalStop { .. })));
    }
}
