//! Tactile confirmation of success and failure, gated by per-user preferences.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Pre-defined feedback patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticEffect {
    /// Single click for success
    Click,
    /// Double click for failure
    DoubleClick,
}

/// Usage tag attached to every effect: assistance sonification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticUsage {
    AssistanceSonification,
}

/// System vibrator capability
pub trait Vibrator: Send + Sync {
    fn vibrate(&self, effect: HapticEffect, usage: HapticUsage);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    SuccessHaptics,
    ErrorHaptics,
}

/// Per-user boolean settings
pub trait PreferenceSource: Send + Sync {
    fn get_bool_for_user(&self, key: PreferenceKey, user_id: i32, default: bool) -> bool;
}

/// Preference source backed by a map, with configurable fallbacks
#[derive(Debug)]
pub struct InMemoryPreferences {
    values: RwLock<HashMap<(PreferenceKey, i32), bool>>,
}

impl InMemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, key: PreferenceKey, user_id: i32, value: bool) {
        let mut values = self
            .values
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        values.insert((key, user_id), value);
    }
}

impl Default for InMemoryPreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceSource for InMemoryPreferences {
    fn get_bool_for_user(&self, key: PreferenceKey, user_id: i32, default: bool) -> bool {
        let values = self
            .values
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        values.get(&(key, user_id)).copied().unwrap_or(default)
    }
}

/// Issues success/failure feedback for one user
#[derive(Clone)]
pub struct HapticGate {
    vibrator: Option<Arc<dyn Vibrator>>,
    preferences: Arc<dyn PreferenceSource>,
    success_default: bool,
    error_default: bool,
}

impl HapticGate {
    #[must_use]
    pub fn new(vibrator: Option<Arc<dyn Vibrator>>, preferences: Arc<dyn PreferenceSource>) -> Self {
        Self {
            vibrator,
            preferences,
            success_default: true,
            error_default: true,
        }
    }

    /// Override the values used when a user has no stored preference
    #[must_use]
    pub const fn with_defaults(mut self, success_default: bool, error_default: bool) -> Self {
        self.success_default = success_default;
        self.error_default = error_default;
        self
    }

    /// Gate with no vibrator; every signal is a no-op
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None, Arc::new(InMemoryPreferences::new()))
    }

    pub fn signal_success(&self, user_id: i32) {
        self.signal(
            PreferenceKey::SuccessHaptics,
            self.success_default,
            HapticEffect::Click,
            user_id,
        );
    }

    pub fn signal_failure(&self, user_id: i32) {
        self.signal(
            PreferenceKey::ErrorHaptics,
            self.error_default,
            HapticEffect::DoubleClick,
            user_id,
        );
    }

    fn signal(&self, key: PreferenceKey, default: bool, effect: HapticEffect, user_id: i32) {
        let Some(vibrator) = &self.vibrator else {
            return;
        };
        if self.preferences.get_bool_for_user(key, user_id, default) {
            vibrator.vibrate(effect, HapticUsage::AssistanceSonification);
        }
    }
}

impl std::fmt::Debug for HapticGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HapticGate")
            .field("has_vibrator", &self.vibrator.is_some())
            .field("success_default", &self.success_default)
            .field("error_default", &self.error_default)
            .finish_non_exhaustive()
    }
}
