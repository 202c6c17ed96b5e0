// Configuration validation
//
// Rejects values that would only fail later, at synthesis or deploy time

use tracing::warn;

use crate::error::StackError;
use crate::types::is_account_id;

use super::StackConfig;

pub fn validate_config(config: &StackConfig) -> Result<(), StackError> {
    if config.stack_name.trim().is_empty() {
        return Err(StackError::Config("stack_name must not be empty".to_string()));
    }

    if !is_account_id(&config.automation_account_id) {
        return Err(StackError::Config(format!(
            "automation_account_id '{}' must be all digits",
            config.automation_account_id
        )));
    }
    if config.automation_account_id.len() != 12 {
        warn!(
            account_id = config.automation_account_id.as_str(),
            "automation_account_id is not 12 digits; the provisioning engine may reject it"
        );
    }

    if config.service_principal.trim().is_empty() {
        return Err(StackError::Config(
            "service_principal must not be empty".to_string(),
        ));
    }
    if config.limited_user_name.trim().is_empty() {
        return Err(StackError::Config(
            "limited_user_name must not be empty".to_string(),
        ));
    }

    check_lookup_path("image_parameter_path", &config.image_parameter_path)?;
    for path in config.lookups.keys() {
        check_lookup_path("lookups", path)?;
    }
    Ok(())
}

fn check_lookup_path(field: &str, path: &str) -> Result<(), StackError> {
    if !path.starts_with('/') {
        return Err(StackError::Config(format!(
            "{field}: '{path}' must start with '/'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        empty_name = { |c: &mut StackConfig| c.stack_name = " ".to_string() },
        letters_in_account = { |c: &mut StackConfig| c.automation_account_id = "12ab".to_string() },
        empty_account = { |c: &mut StackConfig| c.automation_account_id = String::new() },
        empty_principal = { |c: &mut StackConfig| c.service_principal = String::new() },
        empty_user = { |c: &mut StackConfig| c.limited_user_name = String::new() },
        relative_image_path = { |c: &mut StackConfig| c.image_parameter_path = "aws/service/x".to_string() },
        relative_pinned_path = { |c: &mut StackConfig| c.pin("image", "ami-0123456789abcdef0") },
    )]
    fn test_validate_rejects(mutate: fn(&mut StackConfig)) {
        let mut config = StackConfig::default();
        mutate(&mut config);
        assert!(matches!(validate_config(&config), Err(StackError::Config(_))));
    }

    #[test]
    fn test_nine_digit_placeholder_is_accepted() {
        let config = StackConfig::default();
        assert_eq!(config.automation_account_id.len(), 9);
        assert!(validate_config(&config).is_ok());
    }
}
