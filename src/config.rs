use crate::constants::*;
use crate::types::Profile;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// On-disk shape. Every key is optional; missing keys fall back to the
/// selected profile and the built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    port: Option<String>,
    baud_rate: Option<u32>,
    timeout_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    power_off_token: Option<String>,
    profile: Option<Profile>,
    allow_list: Option<Vec<String>>,
    displayable: Option<Vec<u32>>,
}

/// Everything fixed for one session: where the controller lives and which
/// angles it accepts and which ones get a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    pub device: String,
    pub baud_rate: u32,
    /// Per-read timeout, also the acknowledgement wait.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub power_off_token: String,
    /// Sendable commands, in the order they are shown to the operator.
    pub allow_list: Vec<String>,
    /// Angles that get a label. Independent of `allow_list`.
    pub displayable: BTreeSet<u32>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::from_profile(Profile::default())
    }
}

impl PanelConfig {
    pub fn from_profile(profile: Profile) -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            power_off_token: POWER_OFF_TOKEN.to_string(),
            allow_list: profile.allow_list(),
            displayable: profile.displayable(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Self::from_profile(file.profile.unwrap_or_default());

        if let Some(port) = file.port {
            config.device = port;
        }
        if let Some(baud_rate) = file.baud_rate {
            config.baud_rate = baud_rate;
        }
        if let Some(ms) = file.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(token) = file.power_off_token {
            config.power_off_token = token;
        }
        if let Some(allow_list) = file.allow_list {
            config.allow_list = allow_list;
        }
        if let Some(displayable) = file.displayable {
            config.displayable = displayable.into_iter().collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.device = device.to_string();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace both angle sets with the profile's.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.allow_list = profile.allow_list();
        self.displayable = profile.displayable();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allow_list.is_empty() {
            return Err(ConfigError::Invalid("allow_list must not be empty".into()));
        }
        if self.allow_list.iter().any(|v| *v == self.power_off_token) {
            return Err(ConfigError::Invalid(format!(
                "power_off_token {:?} collides with an allow-listed value",
                self.power_off_token
            )));
        }
        if self.power_off_token.is_empty() {
            return Err(ConfigError::Invalid("power_off_token must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be non-zero".into()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".into()));
        }
        Ok(())
    }

    /// Exact membership; no trimming, no numeric range check.
    pub fn is_allowed(&self, input: &str) -> bool {
        self.allow_list.iter().any(|v| v == input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_classic() {
        let config = PanelConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.allow_list, vec!["10", "45", "60", "80"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn membership_is_exact() {
        let config = PanelConfig::default();
        assert!(config.is_allowed("45"));
        assert!(!config.is_allowed(" 45"));
        assert!(!config.is_allowed("50"));
        assert!(!config.is_allowed("045"));
        assert!(!config.is_allowed(""));
    }

    #[test]
    fn builder_overrides() {
        let config = PanelConfig::default()
            .with_device("COM4")
            .with_baud_rate(9600)
            .with_timeout(Duration::from_millis(250))
            .with_profile(Profile::Extended);
        assert_eq!(config.device, "COM4");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert!(config.is_allowed("70"));
        assert!(!config.displayable.contains(&70));
    }

    #[test]
    fn toml_profile_with_independent_override() {
        let config = PanelConfig::from_toml_str(
            r#"
            port = "/dev/ttyACM0"
            profile = "extended"
            displayable = [30, 70]
            "#,
        )
        .unwrap();
        assert_eq!(config.device, "/dev/ttyACM0");
        assert_eq!(config.allow_list, Profile::Extended.allow_list());
        assert_eq!(config.displayable, BTreeSet::from([30, 70]));
    }

    #[test]
    fn toml_rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            PanelConfig::from_toml_str("colour = \"black\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            PanelConfig::from_toml_str("allow_list = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PanelConfig::from_toml_str("allow_list = [\"OFF\"]"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PanelConfig::from_toml_str("timeout_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "baud_rate = 57600\ntimeout_ms = 300\npower_off_token = \"000\"").unwrap();

        let config = PanelConfig::load(file.path()).unwrap();
        assert_eq!(config.baud_rate, 57600);
        assert_eq!(config.timeout, Duration::from_millis(300));
        assert_eq!(config.power_off_token, "000");
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PanelConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
