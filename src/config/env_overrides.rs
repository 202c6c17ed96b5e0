use std::env;

use crate::error::StackError;

use super::StackConfig;

pub const ENV_PREFIX: &str = "AMI_STACK_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own overrides.
pub trait EnvSource {
    /// Look up `key` under the AMI_STACK_ prefix
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{ENV_PREFIX}{key}")).ok()
    }
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(
    config: &mut StackConfig,
    env: &E,
) -> Result<(), StackError> {
    if let Some(account_id) = env.get("ACCOUNT_ID") {
        config.automation_account_id = account_id;
    }
    if let Some(name) = env.get("NAME") {
        config.stack_name = name;
    }
    if let Some(path) = env.get("IMAGE_PARAMETER") {
        config.image_parameter_path = path;
    }
    if let Some(enabled) = get_env_bool(env, "WORKER_INLINE_POLICY")? {
        config.compat.worker_inline_policy = enabled;
    }
    Ok(())
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>, StackError> {
    match env.get(key) {
        Some(val) => match val.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(StackError::Config(format!(
                "Failed to parse {ENV_PREFIX}{key} (expected bool): '{val}'"
            ))),
        },
        None => Ok(None),
    }
}
