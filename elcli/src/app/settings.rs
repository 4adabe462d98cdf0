//! Settings file management
//!
//! Settings come from three layers, lowest precedence first: the YAML
//! configuration file, `EL_*` environment variables, and command line flags.
//! Each layer only fills or replaces the values it actually sets.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::LeapError;
use crate::logs::LogLevel;
use crate::release::provider::{ProviderKind, ProviderOptions};

/// Default configuration file
pub const DEFAULT_CONFIG_FILE: &str = "./edge-leap.yaml";

/// Version of the configuration file layout
pub const CONFIG_VERSION: u32 = 1;

/// Environment variables consulted for blank settings
pub const ENV_HUB: &str = "EL_HUB";
pub const ENV_TOKEN: &str = "EL_TOKEN";
pub const ENV_DEVICE_NAME: &str = "EL_DEVICE_NAME";
pub const ENV_DEPLOYMENT_ID: &str = "EL_DEPLOYMENT_ID";

/// Desired release state as read from the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Draft session id; used as the module version for draft deployments
    #[serde(default)]
    pub session: String,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub module: ModuleSettings,

    #[serde(default)]
    pub deployment: DeploymentSettings,

    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub infra: InfraSettings,

    #[serde(default)]
    pub auth: AuthSettings,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session: String::new(),
            version: CONFIG_VERSION,
            log_level: LogLevel::Info,
            module: ModuleSettings::default(),
            deployment: DeploymentSettings::default(),
            device: DeviceSettings::default(),
            infra: InfraSettings::default(),
            auth: AuthSettings::default(),
        }
    }
}

/// Module settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleSettings {
    /// Module name in the edge runtime (camelCase)
    #[serde(default)]
    pub name: String,

    /// Container image reference
    #[serde(default)]
    pub image: String,

    /// Container create options, as a JSON string
    #[serde(default)]
    pub create_options: String,

    #[serde(default = "default_startup_order")]
    pub startup_order: u32,

    /// `KEY=VALUE` environment entries
    #[serde(default)]
    pub env: Vec<String>,
}

fn default_startup_order() -> u32 {
    20
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            image: String::new(),
            create_options: String::new(),
            startup_order: default_startup_order(),
            env: Vec::new(),
        }
    }
}

/// Deployment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeploymentSettings {
    /// Configuration id (kebab-case)
    #[serde(default)]
    pub id: String,

    #[serde(default = "default_priority")]
    pub priority: i16,

    #[serde(default)]
    pub target_condition: String,
}

fn default_priority() -> i16 {
    50
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            id: String::new(),
            priority: default_priority(),
            target_condition: String::new(),
        }
    }
}

/// Device settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceSettings {
    #[serde(default)]
    pub name: String,
}

/// Hub settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InfraSettings {
    /// Hub provider name
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Hub name
    #[serde(default)]
    pub hub: String,

    /// Explicit REST endpoint; derived from `hub` when absent
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "azure".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for InfraSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            hub: String::new(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Authentication settings
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthSettings {
    #[serde(default)]
    pub token: String,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("AuthSettings").field("token", &token).finish()
    }
}

impl Settings {
    /// Load settings from a YAML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, LeapError> {
        if !path.exists() {
            debug!("Configuration file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse settings from YAML
    pub fn from_yaml(contents: &str) -> Result<Self, LeapError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Fill blank values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Fill blank values using `lookup` as the environment
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fill = |target: &mut String, key: &str| {
            if target.is_empty() {
                if let Some(value) = lookup(key) {
                    *target = value;
                }
            }
        };

        fill(&mut self.infra.hub, ENV_HUB);
        fill(&mut self.auth.token, ENV_TOKEN);
        fill(&mut self.device.name, ENV_DEVICE_NAME);
        fill(&mut self.deployment.id, ENV_DEPLOYMENT_ID);
    }

    /// Apply command line flags. Flags win over file and environment.
    pub fn apply_flags(&mut self, flags: &HashMap<String, String>) -> Result<(), LeapError> {
        for (key, value) in flags {
            match key.as_str() {
                "id" => self.deployment.id = value.clone(),
                "priority" => self.deployment.priority = parse_flag(key, value)?,
                "target-condition" => self.deployment.target_condition = value.clone(),
                "device-name" => self.device.name = value.clone(),
                "module-name" => self.module.name = value.clone(),
                "image" => self.module.image = value.clone(),
                "create-options" => self.module.create_options = value.clone(),
                "startup-order" => self.module.startup_order = parse_flag(key, value)?,
                "env" => {
                    self.module.env = value
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                "session" => self.session = value.clone(),
                "provider" => self.infra.provider = value.clone(),
                "hub" => self.infra.hub = value.clone(),
                "base-url" => self.infra.base_url = Some(value.clone()),
                "timeout" => self.infra.timeout_secs = parse_flag(key, value)?,
                "token" => self.auth.token = value.clone(),
                "log-level" => {
                    self.log_level = value.parse().map_err(LeapError::ConfigError)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Value of a dotted settings key, for required-field checks
    fn value_of(&self, key: &str) -> Option<&str> {
        let value = match key {
            "session" => &self.session,
            "module.name" => &self.module.name,
            "module.image" => &self.module.image,
            "deployment.id" => &self.deployment.id,
            "deployment.target-condition" => &self.deployment.target_condition,
            "device.name" => &self.device.name,
            "infra.hub" => {
                return match &self.infra.base_url {
                    Some(url) if !url.is_empty() => Some(url.as_str()),
                    _ => Some(self.infra.hub.as_str()),
                }
            }
            "auth.token" => &self.auth.token,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Fail with every blank key in `keys`
    pub fn require(&self, keys: &[&str]) -> Result<(), LeapError> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| self.value_of(key).is_none_or(|v| v.trim().is_empty()))
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LeapError::MissingSettings(missing))
        }
    }

    /// Bearer token as a secret
    pub fn token(&self) -> SecretString {
        SecretString::from(self.auth.token.clone())
    }

    /// Provider connection options derived from the infra and auth settings
    pub fn provider_options(&self) -> Result<ProviderOptions, LeapError> {
        let kind: ProviderKind = self.infra.provider.parse()?;
        let base_url = match &self.infra.base_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => kind.base_url(&self.infra.hub),
        };

        Ok(ProviderOptions {
            kind,
            base_url,
            token: self.token(),
            timeout: Duration::from_secs(self.infra.timeout_secs),
        })
    }
}

fn parse_flag<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, LeapError> {
    value
        .parse()
        .map_err(|_| LeapError::ConfigError(format!("invalid value for --{}: {}", key, value)))
}
