//! IAM users.

use serde::Serialize;

use crate::error::StackError;
use crate::traits::CfnResource;

use super::logical_id::{LogicalId, UserId};
use super::resource_type::ResourceType;
use super::value::Value;

/// An IAM user with a fixed name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    id: UserId,
    user_name: Option<String>,
}

impl User {
    pub fn new(construct_id: &str) -> Result<Self, StackError> {
        Ok(User {
            id: LogicalId::new(construct_id)?,
            user_name: None,
        })
    }

    pub fn with_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// The configured name, if any.
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// The user's name as deployed: a `Ref` to the user, which resolves to
    /// its name and orders dependents after it.
    pub fn name_ref(&self) -> Value {
        self.id.to_ref()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UserProperties<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_name: Option<&'a str>,
}

impl CfnResource for User {
    fn resource_type(&self) -> ResourceType {
        ResourceType::User
    }

    fn logical_id(&self) -> LogicalId<()> {
        self.id.erase()
    }

    fn validate(&self) -> Result<(), StackError> {
        match self.user_name.as_deref() {
            Some(name)
                if name.is_empty()
                    || name.len() > 64
                    || !name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c)) =>
            {
                Err(StackError::InvalidFormat(format!(
                    "user name '{name}' of {} is not a valid user name",
                    self.id
                )))
            }
            _ => Ok(()),
        }
    }

    fn cfn_properties(&self) -> Result<serde_json::Value, StackError> {
        Ok(serde_json::to_value(UserProperties {
            user_name: self.user_name.as_deref(),
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_properties() {
        let user = User::new("automation-user")
            .unwrap()
            .with_name("automationLimited");
        assert_eq!(
            user.cfn_properties().unwrap(),
            json!({"UserName": "automationLimited"})
        );
        assert_eq!(user.name_ref(), Value::reference("automationuser"));
    }

    #[test]
    fn test_user_name_validation() {
        let bad = User::new("u").unwrap().with_name("no spaces allowed");
        assert!(bad.validate().is_err());
        let unnamed = User::new("u").unwrap();
        assert!(unnamed.validate().is_ok());
        assert_eq!(unnamed.cfn_properties().unwrap(), json!({}));
    }
}
