use crate::constants::{BiometricConstants, Modality};
use crate::filter::AcquireFilter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Monitor configuration, read from `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub modality: Modality,

    #[serde(default)]
    pub enroll: EnrollConfig,

    #[serde(default)]
    pub authenticate: AuthenticateConfig,

    #[serde(default)]
    pub haptics: HapticsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollConfig {
    #[serde(default)]
    pub acquire_ignorelist: Vec<i32>,

    #[serde(default)]
    pub vendor_ignorelist: Vec<i32>,

    #[serde(default = "default_enroll_timeout")]
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateConfig {
    #[serde(default)]
    pub acquire_ignorelist: Vec<i32>,

    #[serde(default)]
    pub vendor_ignorelist: Vec<i32>,

    /// Rejections tolerated before lockout; 0 disables lockout
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
}

/// Fallbacks for users with no stored haptic preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticsConfig {
    #[serde(default = "default_true")]
    pub success_default: bool,

    #[serde(default = "default_true")]
    pub error_default: bool,
}

fn default_enroll_timeout() -> u32 {
    60
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for EnrollConfig {
    fn default() -> Self {
        Self {
            acquire_ignorelist: Vec::new(),
            vendor_ignorelist: Vec::new(),
            timeout_secs: default_enroll_timeout(),
        }
    }
}

impl Default for AuthenticateConfig {
    fn default() -> Self {
        Self {
            acquire_ignorelist: Vec::new(),
            vendor_ignorelist: Vec::new(),
            max_failed_attempts: default_max_failed_attempts(),
        }
    }
}

impl Default for HapticsConfig {
    fn default() -> Self {
        Self {
            success_default: true,
            error_default: true,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration, falling back to defaults if the file is absent
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// # Errors
    ///
    /// Returns an error if `content` is not valid configuration TOML
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid monitor configuration")
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize monitor configuration")
    }

    #[must_use]
    pub const fn constants(&self) -> BiometricConstants {
        BiometricConstants::new(self.modality)
    }

    #[must_use]
    pub fn enroll_filter(&self) -> AcquireFilter {
        AcquireFilter::with_lists(
            self.constants().acquire_vendor_code(),
            self.enroll.acquire_ignorelist.clone(),
            self.enroll.vendor_ignorelist.clone(),
        )
    }

    #[must_use]
    pub fn authenticate_filter(&self) -> AcquireFilter {
        AcquireFilter::with_lists(
            self.constants().acquire_vendor_code(),
            self.authenticate.acquire_ignorelist.clone(),
            self.authenticate.vendor_ignorelist.clone(),
        )
    }
}

/// Get the default config file path: `<config dir>/biomon/config.toml`
///
/// # Errors
///
/// Returns an error if the config directory cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Failed to get config dir"))?;
    path.push("biomon");
    path.push("config.toml");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MonitorConfig::parse("").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.modality, Modality::Fingerprint);
        assert_eq!(config.enroll.timeout_secs, 60);
        assert_eq!(config.authenticate.max_failed_attempts, 5);
        assert!(config.haptics.success_default);
        assert!(config.haptics.error_default);
    }

    #[test]
    fn test_parse_full_config() {
        let config = MonitorConfig::parse(
            r#"
modality = "face"

[enroll]
acquire_ignorelist = [1, 2]
vendor_ignorelist = [40]
timeout_secs = 75

[authenticate]
acquire_ignorelist = [10]
vendor_ignorelist = [55]
max_failed_attempts = 3

[haptics]
success_default = false
"#,
        )
        .unwrap();

        assert_eq!(config.modality, Modality::Face);
        assert_eq!(config.enroll.acquire_ignorelist, vec![1, 2]);
        assert_eq!(config.enroll.timeout_secs, 75);
        assert_eq!(config.authenticate.max_failed_attempts, 3);
        assert!(!config.haptics.success_default);
        assert!(config.haptics.error_default);

        let filter = config.authenticate_filter();
        assert!(filter.should_ignore(10, 0));
        assert!(filter.should_ignore(22, 55));
        assert!(!filter.should_ignore(6, 55));
    }

    #[test]
    fn test_unknown_modality_rejected() {
        assert!(MonitorConfig::parse("modality = \"iris\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[enroll]\ntimeout_secs = 30").unwrap();

        let config = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(config.enroll.timeout_secs, 30);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_toml_roundtrip_preserves_lists() {
        let mut config = MonitorConfig::default();
        config.enroll.vendor_ignorelist = vec![7, 8];
        let parsed = MonitorConfig::parse(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
