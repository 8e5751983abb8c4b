use crate::descriptor::BiometricIdentifier;
use crate::error::ListenerError;

/// Sink that forwards session events to the requesting client.
///
/// Every delivery can fail when the channel to the client is broken.
/// Implementations must not call back into the monitor that invokes them.
pub trait ServiceListener: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the event could not be delivered
    fn on_acquired(
        &self,
        device_id: u64,
        acquired_info: i32,
        vendor_code: i32,
    ) -> Result<(), ListenerError>;

    /// # Errors
    ///
    /// Returns an error if the event could not be delivered
    fn on_error(
        &self,
        device_id: u64,
        error: i32,
        vendor_code: i32,
        cookie: i32,
    ) -> Result<(), ListenerError>;

    /// # Errors
    ///
    /// Returns an error if the event could not be delivered
    fn on_enroll_result(
        &self,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> Result<(), ListenerError>;

    /// # Errors
    ///
    /// Returns an error if the event could not be delivered
    fn on_authentication_succeeded(
        &self,
        identifier: &BiometricIdentifier,
        token: &[u8],
    ) -> Result<(), ListenerError>;

    /// # Errors
    ///
    /// Returns an error if the event could not be delivered
    fn on_authentication_failed(&self, device_id: u64) -> Result<(), ListenerError>;

    /// # Errors
    ///
    /// Returns an error if the event could not be delivered
    fn on_removed(
        &self,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> Result<(), ListenerError>;

    /// # Errors
    ///
    /// Returns an error if the event could not be delivered
    fn on_enumerated(
        &self,
        identifier: &BiometricIdentifier,
        remaining: i32,
    ) -> Result<(), ListenerError>;
}
