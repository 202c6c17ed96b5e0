//! Managed policies: reusable statement bundles attachable to many roles.

use serde::Serialize;

use crate::error::StackError;
use crate::traits::CfnResource;

use super::arn::ArnComponents;
use super::logical_id::{LogicalId, PolicyId};
use super::resource_type::ResourceType;
use super::statement::{PolicyDocument, PolicyStatement};
use super::value::Value;

/// A policy a role can attach: either provided by AWS or declared in this stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ManagedPolicyRef {
    /// An AWS managed policy by name, e.g. `service-role/AmazonSSMAutomationRole`.
    AwsManaged(String),
    /// A managed policy declared in this stack.
    Local(PolicyId),
}

impl ManagedPolicyRef {
    pub fn aws_managed(name: impl Into<String>) -> Self {
        ManagedPolicyRef::AwsManaged(name.into())
    }

    /// The policy ARN as rendered into `ManagedPolicyArns`.
    pub fn arn(&self) -> Result<Value, StackError> {
        match self {
            ManagedPolicyRef::AwsManaged(name) => ArnComponents {
                partition: None,
                service: "iam".to_string(),
                region: Value::literal(""),
                account: Value::literal("aws"),
                resource: "policy".to_string(),
                resource_name: Some(Value::literal(name.clone())),
            }
            .format(),
            ManagedPolicyRef::Local(id) => Ok(id.to_ref()),
        }
    }
}

impl From<&PolicyId> for ManagedPolicyRef {
    fn from(id: &PolicyId) -> Self {
        ManagedPolicyRef::Local(id.clone())
    }
}

/// A customer managed policy declared in the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    id: PolicyId,
    document: PolicyDocument,
}

impl ManagedPolicy {
    pub fn new(
        construct_id: &str,
        statements: impl IntoIterator<Item = PolicyStatement>,
    ) -> Result<Self, StackError> {
        Ok(ManagedPolicy {
            id: LogicalId::new(construct_id)?,
            document: PolicyDocument::new(statements),
        })
    }

    pub fn id(&self) -> &PolicyId {
        &self.id
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ManagedPolicyProperties<'a> {
    path: &'a str,
    policy_document: &'a PolicyDocument,
}

impl CfnResource for ManagedPolicy {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ManagedPolicy
    }

    fn logical_id(&self) -> LogicalId<()> {
        self.id.erase()
    }

    fn validate(&self) -> Result<(), StackError> {
        if self.document.is_empty() {
            return Err(StackError::InvalidStatement(format!(
                "managed policy {} has no statements",
                self.id
            )));
        }
        self.document.validate()
    }

    fn cfn_properties(&self) -> Result<serde_json::Value, StackError> {
        Ok(serde_json::to_value(ManagedPolicyProperties {
            path: "/",
            policy_document: &self.document,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aws_managed_arn() {
        let arn = ManagedPolicyRef::aws_managed("service-role/AmazonSSMAutomationRole")
            .arn()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&arn).unwrap(),
            json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                ":iam::aws:policy/service-role/AmazonSSMAutomationRole"
            ]]})
        );
    }

    #[test]
    fn test_local_ref_arn_is_ref() {
        let policy = ManagedPolicy::new("test-managed-policy", [
            PolicyStatement::allow(["tag:GetResources"], ["*"]),
        ])
        .unwrap();
        let r = ManagedPolicyRef::from(policy.id());
        assert_eq!(r.arn().unwrap(), Value::reference("testmanagedpolicy"));
    }

    #[test]
    fn test_managed_policy_properties() {
        let policy = ManagedPolicy::new("p", [PolicyStatement::allow(["tag:GetResources"], ["*"])])
            .unwrap();
        let props = policy.cfn_properties().unwrap();
        assert_eq!(props["Path"], json!("/"));
        assert_eq!(props["PolicyDocument"]["Version"], json!("2012-10-17"));
    }

    #[test]
    fn test_empty_managed_policy_is_invalid() {
        let policy = ManagedPolicy::new("p", []).unwrap();
        assert!(policy.validate().is_err());
    }
}
