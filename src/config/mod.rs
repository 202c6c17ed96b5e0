// Stack configuration
//
// Sources, highest priority first:
// 1. Environment variables (AMI_STACK_* prefix)
// 2. Config file: --config, else AMI_STACK_CONFIG, else ./ami-stack.toml
// 3. Built-in defaults

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StackError;
use crate::stack::StackContext;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{ENV_PREFIX, EnvSource, StdEnvSource};
pub use sources::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};

pub const DEFAULT_STACK_NAME: &str = "AmiAutomationStack";
pub const DEFAULT_ACCOUNT_ID: &str = "123456789";
pub const DEFAULT_SERVICE_PRINCIPAL: &str = "ssm.amazonaws.com";
pub const DEFAULT_LIMITED_USER_NAME: &str = "automationLimited";
pub const DEFAULT_IMAGE_PARAMETER_PATH: &str =
    "/aws/service/ami-windows-latest/Windows_Server-2019-English-Full-ECS_Optimized/image_id";

/// Everything the AMI update stack is parameterized by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub stack_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Account that runs automations and holds the limited user
    pub automation_account_id: String,
    pub service_principal: String,
    pub limited_user_name: String,
    /// Parameter-store path the image id is read from
    pub image_parameter_path: String,
    /// Pinned lookup values by parameter path
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub lookups: BTreeMap<String, String>,
    pub compat: CompatConfig,
}

/// Switches that reproduce older template output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    /// Repeat the local managed policy's statements inline on the worker role
    pub worker_inline_policy: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            description: None,
            automation_account_id: DEFAULT_ACCOUNT_ID.to_string(),
            service_principal: DEFAULT_SERVICE_PRINCIPAL.to_string(),
            limited_user_name: DEFAULT_LIMITED_USER_NAME.to_string(),
            image_parameter_path: DEFAULT_IMAGE_PARAMETER_PATH.to_string(),
            lookups: BTreeMap::new(),
            compat: CompatConfig::default(),
        }
    }
}

impl StackConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, StackError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from an explicit path or the default locations, then apply
    /// process environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, StackError> {
        Self::load_with_env(path, &StdEnvSource)
    }

    pub fn load_with_env<E: EnvSource>(path: Option<&Path>, env: &E) -> Result<Self, StackError> {
        let mut config = sources::load_file(path, env)?.unwrap_or_default();
        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<E: EnvSource>(&mut self, env: &E) -> Result<(), StackError> {
        env_overrides::apply_env_overrides(self, env)
    }

    pub fn validate(&self) -> Result<(), StackError> {
        validation::validate_config(self)
    }

    /// Pin a lookup path to a fixed value.
    pub fn pin(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.lookups.insert(path.into(), value.into());
    }

    /// The build context carrying pinned lookups.
    pub fn context(&self) -> StackContext {
        self.lookups
            .iter()
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect()
    }
}
