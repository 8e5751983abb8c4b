//! Replay script format: one session descriptor, the simulated HAL's
//! status codes, and an ordered list of events to feed the monitor.

use anyhow::{Context, Result};
use biomon_core::ClientKind;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    pub session: SessionSpec,

    #[serde(default)]
    pub hal: HalSpec,

    #[serde(default)]
    pub listener: ListenerSpec,

    #[serde(default, rename = "event")]
    pub events: Vec<ScriptEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSpec {
    pub variant: ClientKind,
    #[serde(default)]
    pub user_id: i32,
    #[serde(default)]
    pub group_id: i32,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub cookie: i32,
    #[serde(default = "default_device_id")]
    pub device_id: u64,
    /// Authenticate only
    #[serde(default)]
    pub operation_id: u64,
    /// Remove only; 0 removes the whole group
    #[serde(default)]
    pub biometric_id: i32,
    /// Enroll only
    #[serde(default)]
    pub hardware_auth_token: Vec<u8>,
    /// Whether the session watches a client token for death
    #[serde(default = "default_true")]
    pub with_token: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct HalSpec {
    #[serde(default)]
    pub start_status: i32,
    #[serde(default)]
    pub stop_status: i32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListenerSpec {
    /// Break the listener channel after this many successful deliveries
    pub fail_after: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptEvent {
    Acquired {
        info: i32,
        #[serde(default)]
        vendor: i32,
    },
    Error {
        error: i32,
        #[serde(default)]
        vendor: i32,
        /// Defaults to the session's device id
        device_id: Option<u64>,
    },
    EnrollResult {
        biometric_id: i32,
        remaining: i32,
    },
    Authenticated {
        biometric_id: i32,
        authenticated: bool,
        #[serde(default)]
        token: Vec<u8>,
    },
    Removed {
        biometric_id: i32,
        remaining: i32,
    },
    Enumerated {
        biometric_id: i32,
        remaining: i32,
    },
    Stop {
        #[serde(default = "default_true")]
        initiated_by_client: bool,
    },
    ClientDied,
    Destroy,
}

fn default_owner() -> String {
    String::from("biomon.replay")
}

fn default_device_id() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

impl ReplayScript {
    /// # Errors
    ///
    /// Returns an error if the script is not valid TOML or misses fields
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid replay script")
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In script: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_script() {
        let script = ReplayScript::parse("[session]\nvariant = \"enumerate\"\n").unwrap();
        assert_eq!(script.session.variant, ClientKind::Enumerate);
        assert_eq!(script.session.device_id, 1);
        assert!(script.session.with_token);
        assert_eq!(script.hal.start_status, 0);
        assert!(script.listener.fail_after.is_none());
        assert!(script.events.is_empty());
    }

    #[test]
    fn test_parse_events_in_order() {
        let script = ReplayScript::parse(
            r#"
[session]
variant = "authenticate"
cookie = 42
operation_id = 9

[hal]
stop_status = 3

[[event]]
kind = "acquired"
info = 6
vendor = 55

[[event]]
kind = "authenticated"
biometric_id = 4
authenticated = false

[[event]]
kind = "stop"

[[event]]
kind = "client_died"

[[event]]
kind = "error"
error = 5
"#,
        )
        .unwrap();

        assert_eq!(script.session.cookie, 42);
        assert_eq!(script.hal.stop_status, 3);
        assert_eq!(
            script.events,
            vec![
                ScriptEvent::Acquired { info: 6, vendor: 55 },
                ScriptEvent::Authenticated {
                    biometric_id: 4,
                    authenticated: false,
                    token: vec![],
                },
                ScriptEvent::Stop {
                    initiated_by_client: true
                },
                ScriptEvent::ClientDied,
                ScriptEvent::Error {
                    error: 5,
                    vendor: 0,
                    device_id: None,
                },
            ]
        );
    }

    #[test]
    fn test_unknown_event_kind_rejected() {
        let result = ReplayScript::parse(
            "[session]\nvariant = \"enroll\"\n[[event]]\nkind = \"teleport\"\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(ReplayScript::parse("[session]\nvariant = \"verify\"\n").is_err());
    }
}
