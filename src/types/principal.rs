//! Principals that may be trusted to assume a role.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::StackError;

use super::arn::{Arn, ArnComponents, is_account_id};
use super::value::Value;

static SERVICE_PRINCIPAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]*(\.[a-z0-9][a-z0-9-]*)*\.amazonaws\.com(\.cn)?$").unwrap()
});

/// A trusted identity in a role's trust policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    /// A service, e.g. `ssm.amazonaws.com`.
    Service(String),
    /// Every identity of an account, rendered as the account's root ARN.
    Account(String),
    /// A single identity by ARN; the value may hold tokens.
    Arn(Value),
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Principal::Service(name.into())
    }

    pub fn account(account_id: impl Into<String>) -> Self {
        Principal::Account(account_id.into())
    }

    pub fn arn(arn: impl Into<Value>) -> Self {
        Principal::Arn(arn.into())
    }

    /// Check the identifier is well formed. Tokens are left to the engine.
    pub fn validate(&self) -> Result<(), StackError> {
        match self {
            Principal::Service(name) if !SERVICE_PRINCIPAL.is_match(name) => Err(
                StackError::InvalidPrincipal(format!("'{name}' is not a service principal")),
            ),
            Principal::Account(id) if !is_account_id(id) => Err(StackError::InvalidPrincipal(
                format!("'{id}' is not an account id"),
            )),
            Principal::Arn(value) => match value.as_literal() {
                Some(literal) => Arn::from_str(literal)
                    .map(|_| ())
                    .map_err(|e| StackError::InvalidPrincipal(e.to_string())),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// The key this principal lives under in a policy's `Principal` block.
    pub fn policy_key(&self) -> &'static str {
        match self {
            Principal::Service(_) => "Service",
            Principal::Account(_) | Principal::Arn(_) => "AWS",
        }
    }

    /// The value rendered under [`Principal::policy_key`].
    pub fn policy_value(&self) -> Result<Value, StackError> {
        match self {
            Principal::Service(name) => Ok(Value::literal(name.clone())),
            Principal::Account(id) => ArnComponents {
                partition: None,
                service: "iam".to_string(),
                region: Value::literal(""),
                account: Value::literal(id.clone()),
                resource: "root".to_string(),
                resource_name: None,
            }
            .format(),
            Principal::Arn(value) => Ok(value.clone()),
        }
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Principal::Service(name) => write!(f, "Service({name})"),
            Principal::Account(id) => write!(f, "Account({id})"),
            Principal::Arn(value) => write!(f, "Arn({value})"),
        }
    }
}

/// Serializes as `{"Service": "..."}` or `{"AWS": ...}`.
impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.policy_value().map_err(serde::ser::Error::custom)?;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.policy_key(), &value)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yare::parameterized;

    #[parameterized(
        ssm = { Principal::service("ssm.amazonaws.com") },
        china = { Principal::service("ec2.amazonaws.com.cn") },
        account = { Principal::account("123456789") },
        literal_arn = { Principal::arn("arn:aws:iam::123456789:user/automationLimited") },
        token_arn = { Principal::arn(Value::reference("automationuser")) },
    )]
    fn test_principal_validate_accepts(principal: Principal) {
        assert!(principal.validate().is_ok());
    }

    #[parameterized(
        bare_service = { Principal::service("ssm") },
        uppercase_service = { Principal::service("SSM.amazonaws.com") },
        non_digit_account = { Principal::account("12345x") },
        empty_account = { Principal::account("") },
        bad_arn = { Principal::arn("user/automationLimited") },
    )]
    fn test_principal_validate_rejects(principal: Principal) {
        assert!(matches!(
            principal.validate(),
            Err(StackError::InvalidPrincipal(_))
        ));
    }

    #[test]
    fn test_service_principal_serialization() {
        let p = Principal::service("ssm.amazonaws.com");
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            json!({"Service": "ssm.amazonaws.com"})
        );
    }

    #[test]
    fn test_account_principal_is_root_arn() {
        let p = Principal::account("123456789");
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            json!({"AWS": {"Fn::Join": ["", ["arn:", {"Ref": "AWS::Partition"}, ":iam::123456789:root"]]}})
        );
    }

    #[test]
    fn test_principal_display() {
        assert_eq!(
            Principal::service("ssm.amazonaws.com").to_string(),
            "Service(ssm.amazonaws.com)"
        );
        assert_eq!(Principal::account("1").to_string(), "Account(1)");
    }
}
