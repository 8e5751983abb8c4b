use crate::monitor::ClientKind;

/// Audit sink for raw HAL events, called before any filtering
pub trait MetricsSink: Send + Sync {
    fn log_on_acquired(&self, kind: ClientKind, acquired_info: i32, vendor_code: i32, user_id: i32);

    fn log_on_error(&self, kind: ClientKind, error: i32, vendor_code: i32, user_id: i32);
}

/// Writes raw events to the `log` facade under the `biomon::metrics` target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn log_on_acquired(&self, kind: ClientKind, acquired_info: i32, vendor_code: i32, user_id: i32) {
        log::debug!(
            target: "biomon::metrics",
            "acquired action={} info={acquired_info} vendor={vendor_code} user={user_id}",
            kind.as_str()
        );
    }

    fn log_on_error(&self, kind: ClientKind, error: i32, vendor_code: i32, user_id: i32) {
        log::info!(
            target: "biomon::metrics",
            "error action={} error={error} vendor={vendor_code} user={user_id}",
            kind.as_str()
        );
    }
}
