//! Acquisition and error codes shared with the biometric HAL, plus the
//! per-modality constants a monitor needs (log tag, vendor sentinel).

use serde::{Deserialize, Serialize};

/// Likely HAL is dead. See errno.h.
pub const ERROR_ESRCH: i32 = 3;

/// Operation already in progress. See errno.h.
pub const ERROR_EALREADY: i32 = 114;

// Standard acquisition codes
pub const ACQUIRED_GOOD: i32 = 0;
pub const ACQUIRED_PARTIAL: i32 = 1;
pub const ACQUIRED_INSUFFICIENT: i32 = 2;
pub const ACQUIRED_IMAGER_DIRTY: i32 = 3;
pub const ACQUIRED_TOO_SLOW: i32 = 4;
pub const ACQUIRED_TOO_FAST: i32 = 5;

// Error codes
pub const ERROR_HW_UNAVAILABLE: i32 = 1;
pub const ERROR_UNABLE_TO_PROCESS: i32 = 2;
pub const ERROR_TIMEOUT: i32 = 3;
pub const ERROR_NO_SPACE: i32 = 4;
pub const ERROR_CANCELED: i32 = 5;
pub const ERROR_UNABLE_TO_REMOVE: i32 = 6;
pub const ERROR_LOCKOUT: i32 = 7;
pub const ERROR_VENDOR: i32 = 8;
pub const ERROR_LOCKOUT_PERMANENT: i32 = 9;
pub const ERROR_USER_CANCELED: i32 = 10;

/// Biometric modality served by the HAL a monitor talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    #[default]
    Fingerprint,
    Face,
}

/// Constants that differ between modalities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiometricConstants {
    modality: Modality,
}

impl BiometricConstants {
    #[must_use]
    pub const fn new(modality: Modality) -> Self {
        Self { modality }
    }

    #[must_use]
    pub const fn modality(&self) -> Modality {
        self.modality
    }

    /// Prefix used on every log line a monitor emits
    #[must_use]
    pub const fn log_tag(&self) -> &'static str {
        match self.modality {
            Modality::Fingerprint => "FingerprintService",
            Modality::Face => "FaceService",
        }
    }

    /// Acquisition code meaning "look at the vendor code instead"
    #[must_use]
    pub const fn acquire_vendor_code(&self) -> i32 {
        match self.modality {
            Modality::Fingerprint => 6,
            Modality::Face => 22,
        }
    }
}

impl Default for BiometricConstants {
    fn default() -> Self {
        Self::new(Modality::Fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_sentinel_per_modality() {
        assert_eq!(BiometricConstants::new(Modality::Fingerprint).acquire_vendor_code(), 6);
        assert_eq!(BiometricConstants::new(Modality::Face).acquire_vendor_code(), 22);
    }

    #[test]
    fn test_log_tag_per_modality() {
        assert_eq!(BiometricConstants::default().log_tag(), "FingerprintService");
        assert_eq!(BiometricConstants::new(Modality::Face).log_tag(), "FaceService");
    }
}
