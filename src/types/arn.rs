//! Amazon Resource Names, either formatted from components (possibly holding
//! tokens) or parsed from literals for validation.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StackError;

use super::value::Value;

static ACCOUNT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
static SERVICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").unwrap());

/// Returns true for an all-digit account id.
pub fn is_account_id(s: &str) -> bool {
    ACCOUNT_ID.is_match(s)
}

/// Components of an ARN of the form
/// `arn:{partition}:{service}:{region}:{account}:{resource}/{resource_name}`.
///
/// The partition defaults to the `AWS::Partition` pseudo parameter, so the
/// formatted ARN stays valid in every partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnComponents {
    pub partition: Option<Value>,
    pub service: String,
    pub region: Value,
    pub account: Value,
    pub resource: String,
    pub resource_name: Option<Value>,
}

impl ArnComponents {
    /// An IAM ARN: IAM is global, so the region is empty.
    pub fn iam(
        resource: impl Into<String>,
        account: impl Into<Value>,
        resource_name: impl Into<Value>,
    ) -> Self {
        ArnComponents {
            partition: None,
            service: "iam".to_string(),
            region: Value::literal(""),
            account: account.into(),
            resource: resource.into(),
            resource_name: Some(resource_name.into()),
        }
    }

    pub fn with_partition(mut self, partition: impl Into<Value>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Render the ARN as a value, concatenating any tokens it holds.
    pub fn format(&self) -> Result<Value, StackError> {
        if !SERVICE.is_match(&self.service) {
            return Err(StackError::InvalidArn(format!(
                "service '{}' is not a valid service namespace",
                self.service
            )));
        }
        if self.resource.is_empty() {
            return Err(StackError::InvalidArn(format!(
                "missing resource for service '{}'",
                self.service
            )));
        }
        if let Some(account) = self.account.as_literal() {
            if !account.is_empty() && account != "*" && account != "aws" && !is_account_id(account)
            {
                return Err(StackError::InvalidArn(format!(
                    "account '{account}' is not an account id"
                )));
            }
        }

        let partition = self.partition.clone().unwrap_or_else(Value::partition);
        let mut parts = vec![
            Value::literal("arn:"),
            partition,
            Value::literal(format!(":{}:", self.service)),
            self.region.clone(),
            Value::literal(":"),
            self.account.clone(),
            Value::literal(format!(":{}", self.resource)),
        ];
        if let Some(name) = &self.resource_name {
            parts.push(Value::literal("/"));
            parts.push(name.clone());
        }
        Ok(Value::concat(parts))
    }
}

/// A literal ARN split into its fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account: String,
    /// Everything after the fifth colon, e.g. `role/Admin`.
    pub resource: String,
}

impl FromStr for Arn {
    type Err = StackError;

    /// Accepts wildcards anywhere, e.g. `arn:aws:iam::*:role/Worker`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(6, ':').collect();
        if parts.len() != 6 || parts[0] != "arn" {
            return Err(StackError::InvalidArn(format!(
                "'{s}' (expected format: arn:partition:service:region:account:resource)"
            )));
        }
        if parts[1].is_empty() || parts[2].is_empty() || parts[5].is_empty() {
            return Err(StackError::InvalidArn(format!(
                "'{s}' has an empty partition, service or resource"
            )));
        }
        Ok(Arn {
            partition: parts[1].to_string(),
            service: parts[2].to_string(),
            region: parts[3].to_string(),
            account: parts[4].to_string(),
            resource: parts[5].to_string(),
        })
    }
}

impl Display for Arn {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yare::parameterized;

    #[test]
    fn test_iam_role_arn_with_token_name() {
        let name = Value::concat([Value::literal("Worker-"), Value::region()]);
        let arn = ArnComponents::iam("role", "123456789", name).format().unwrap();
        assert_eq!(
            serde_json::to_value(&arn).unwrap(),
            json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                ":iam::123456789:role/Worker-",
                {"Ref": "AWS::Region"}
            ]]})
        );
    }

    #[test]
    fn test_arn_with_literal_partition_collapses() {
        let arn = ArnComponents::iam("user", "123456789", "automationLimited")
            .with_partition("aws")
            .format()
            .unwrap();
        assert_eq!(
            arn.as_literal(),
            Some("arn:aws:iam::123456789:user/automationLimited")
        );
    }

    #[parameterized(
        bad_service = { "IAM", "123456789" },
        bad_account = { "iam", "not-an-account" },
    )]
    fn test_arn_format_rejects(service: &str, account: &str) {
        let mut components = ArnComponents::iam("role", account, "x");
        components.service = service.to_string();
        assert!(matches!(
            components.format(),
            Err(StackError::InvalidArn(_))
        ));
    }

    #[parameterized(
        role = { "arn:aws:iam::123456789:role/Admin", "iam", "role/Admin" },
        wildcard_account = { "arn:aws:iam::*:role/Worker", "iam", "role/Worker" },
        colon_in_resource = { "arn:aws:ssm:eu-west-1:123456789:parameter/a:b", "ssm", "parameter/a:b" },
    )]
    fn test_arn_from_str(input: &str, service: &str, resource: &str) {
        let arn = Arn::from_str(input).unwrap();
        assert_eq!(arn.service, service);
        assert_eq!(arn.resource, resource);
        assert_eq!(arn.to_string(), input);
    }

    #[parameterized(
        not_an_arn = { "role/Admin" },
        too_few_fields = { "arn:aws:iam::123" },
        empty_service = { "arn:aws:::123:role/x" },
    )]
    fn test_arn_from_str_rejects(input: &str) {
        assert!(Arn::from_str(input).is_err());
    }
}
