use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, Ordering};

/// Immutable identity of one HAL session, frozen at monitor construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    target_user_id: i32,
    group_id: i32,
    is_restricted: bool,
    owner: String,
    /// 0 means "no cookie"
    cookie: i32,
    hardware_device_id: u64,
}

impl SessionDescriptor {
    #[must_use]
    pub fn new(
        hardware_device_id: u64,
        target_user_id: i32,
        group_id: i32,
        is_restricted: bool,
        owner: impl Into<String>,
        cookie: i32,
    ) -> Self {
        Self {
            target_user_id,
            group_id,
            is_restricted,
            owner: owner.into(),
            cookie,
            hardware_device_id,
        }
    }

    #[must_use]
    pub const fn target_user_id(&self) -> i32 {
        self.target_user_id
    }

    #[must_use]
    pub const fn group_id(&self) -> i32 {
        self.group_id
    }

    /// True if the client lacks the permission to manage enrollments
    #[must_use]
    pub const fn is_restricted(&self) -> bool {
        self.is_restricted
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub const fn cookie(&self) -> i32 {
        self.cookie
    }

    #[must_use]
    pub const fn has_cookie(&self) -> bool {
        self.cookie != 0
    }

    #[must_use]
    pub const fn hardware_device_id(&self) -> u64 {
        self.hardware_device_id
    }
}

/// A template reported by the HAL alongside enroll/auth/remove/enumerate results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BiometricIdentifier {
    pub biometric_id: i32,
    pub group_id: i32,
    pub device_id: u64,
    #[serde(default)]
    pub name: String,
}

impl BiometricIdentifier {
    #[must_use]
    pub fn new(biometric_id: i32, group_id: i32, device_id: u64) -> Self {
        Self {
            biometric_id,
            group_id,
            device_id,
            name: String::new(),
        }
    }
}

/// Hands out cookies for pending authentication requests.
///
/// Cookies are unique among outstanding requests and never 0, since 0 is
/// reserved for sessions without a cookie.
#[derive(Debug)]
pub struct CookieAllocator {
    next: AtomicI32,
}

impl CookieAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicI32::new(1),
        }
    }

    /// Allocate the next cookie, wrapping past `i32::MAX` and skipping 0
    pub fn allocate(&self) -> i32 {
        loop {
            let cookie = self.next.fetch_add(1, Ordering::Relaxed);
            if cookie > 0 {
                return cookie;
            }
            // Wrapped into negatives; restart the sequence. Losing this race
            // to another thread just means one of us retries.
            let _ = self
                .next
                .compare_exchange(cookie.wrapping_add(1), 1, Ordering::Relaxed, Ordering::Relaxed);
        }
    }
}

impl Default for CookieAllocator {
    fn default() -> Self {
        Self::new()
    }
}
