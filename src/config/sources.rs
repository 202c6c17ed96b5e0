// Configuration file discovery.
//
// Priority order:
// 1. Explicit path (CLI --config)
// 2. Path from AMI_STACK_CONFIG
// 3. ./ami-stack.toml, if it exists

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StackError;

use super::StackConfig;
use super::env_overrides::EnvSource;

/// Environment key (without prefix) naming the config file.
pub const CONFIG_PATH_ENV: &str = "CONFIG";

pub const DEFAULT_CONFIG_FILE: &str = "ami-stack.toml";

pub(super) fn load_file<E: EnvSource>(
    explicit: Option<&Path>,
    env: &E,
) -> Result<Option<StackConfig>, StackError> {
    if let Some(path) = explicit {
        return read(path).map(Some);
    }
    if let Some(path) = env.get(CONFIG_PATH_ENV) {
        return read(&PathBuf::from(path)).map(Some);
    }
    let default = Path::new(DEFAULT_CONFIG_FILE);
    if default.exists() {
        return read(default).map(Some);
    }
    debug!(event = "Config", phase = "Defaults", "no config file found");
    Ok(None)
}

fn read(path: &Path) -> Result<StackConfig, StackError> {
    let content = fs::read_to_string(path).map_err(|e| {
        StackError::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    let config = toml::from_str(&content).map_err(|e| {
        StackError::Config(format!("Failed to parse config file {}: {e}", path.display()))
    })?;
    debug!(event = "Config", phase = "Loaded", path = %path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env_overrides::tests::MapEnv;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = config_file("stack_name = \"FromFlag\"");
        let from_env = config_file("stack_name = \"FromEnv\"");
        let env = MapEnv::default().with("CONFIG", from_env.path().to_str().unwrap());
        let config = load_file(Some(explicit.path()), &env).unwrap().unwrap();
        assert_eq!(config.stack_name, "FromFlag");
    }

    #[test]
    fn test_env_path_is_used() {
        let from_env = config_file("stack_name = \"FromEnv\"");
        let env = MapEnv::default().with("CONFIG", from_env.path().to_str().unwrap());
        let config = load_file(None, &env).unwrap().unwrap();
        assert_eq!(config.stack_name, "FromEnv");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = load_file(Some(missing.as_path()), &MapEnv::default()).unwrap_err();
        assert!(matches!(err, StackError::Config(msg) if msg.contains("Failed to read")));
    }

    #[test]
    fn test_unparseable_file_names_the_path() {
        let file = config_file("compat = 3");
        let err = load_file(Some(file.path()), &MapEnv::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_applies_env_over_file() {
        let file = config_file("automation_account_id = \"111111111111\"");
        let env = MapEnv::default().with("ACCOUNT_ID", "222222222222");
        let config = StackConfig::load_with_env(Some(file.path()), &env).unwrap();
        assert_eq!(config.automation_account_id, "222222222222");
    }

    #[test]
    fn test_load_validates() {
        let file = config_file("automation_account_id = \"not-digits\"");
        let err = StackConfig::load_with_env(Some(file.path()), &MapEnv::default()).unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }
}
