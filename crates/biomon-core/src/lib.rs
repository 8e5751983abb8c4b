pub mod config;
pub mod constants;
pub mod daemon;
pub mod death;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod haptics;
pub mod listener;
pub mod metrics;
pub mod monitor;
pub mod power;

pub use config::{default_config_path, MonitorConfig};
pub use constants::{BiometricConstants, Modality};
pub use daemon::{BiometricDaemon, DaemonRequest};
pub use death::{process_alive, watch_process, ClientToken, DeathRecipient, LinkId};
pub use descriptor::{BiometricIdentifier, CookieAllocator, SessionDescriptor};
pub use error::{ListenerError, TokenError};
pub use filter::{is_ignored, AcquireFilter};
pub use haptics::{
    HapticEffect, HapticGate, HapticUsage, InMemoryPreferences, PreferenceKey, PreferenceSource,
    Vibrator,
};
pub use listener::ServiceListener;
pub use metrics::{LogMetricsSink, MetricsSink};
pub use monitor::{
    AuthenticateClient, ClientContext, ClientKind, ClientMonitor, ClientVariant, EnrollClient,
    EnumerateClient, MonitorPhase, RemoveClient, SessionMonitor, TerminationState, VariantScope,
};
pub use power::{NoopUserActivity, UserActivity};
