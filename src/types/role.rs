//! IAM roles with a trust policy, attached managed policies and inline policies.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::StackError;
use crate::traits::CfnResource;

use super::logical_id::{LogicalId, RoleId};
use super::managed_policy::ManagedPolicyRef;
use super::principal::Principal;
use super::resource_type::ResourceType;
use super::statement::{Effect, POLICY_VERSION, PolicyDocument};
use super::value::Value;

static ROLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w+=,.@-]{1,64}$").unwrap());

/// An IAM role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    id: RoleId,
    role_name: Option<Value>,
    assumed_by: Vec<Principal>,
    managed_policies: Vec<ManagedPolicyRef>,
    inline_policies: BTreeMap<String, PolicyDocument>,
    path: Option<String>,
}

impl Role {
    /// Create a role trusted by the given principals.
    pub fn new(
        construct_id: &str,
        assumed_by: impl IntoIterator<Item = Principal>,
    ) -> Result<Self, StackError> {
        Ok(Role {
            id: LogicalId::new(construct_id)?,
            role_name: None,
            assumed_by: assumed_by.into_iter().collect(),
            managed_policies: Vec::new(),
            inline_policies: BTreeMap::new(),
            path: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<Value>) -> Self {
        self.role_name = Some(name.into());
        self
    }

    pub fn with_managed_policy(mut self, policy: ManagedPolicyRef) -> Self {
        self.managed_policies.push(policy);
        self
    }

    /// Add an inline policy; a second document under the same name replaces the first.
    pub fn with_inline_policy(mut self, name: impl Into<String>, document: PolicyDocument) -> Self {
        self.inline_policies.insert(name.into(), document);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn id(&self) -> &RoleId {
        &self.id
    }

    pub fn role_name(&self) -> Option<&Value> {
        self.role_name.as_ref()
    }

    pub fn assumed_by(&self) -> &[Principal] {
        &self.assumed_by
    }

    pub fn managed_policies(&self) -> &[ManagedPolicyRef] {
        &self.managed_policies
    }

    pub fn inline_policies(&self) -> &BTreeMap<String, PolicyDocument> {
        &self.inline_policies
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// One `sts:AssumeRole` statement per trusted principal.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TrustStatement<'a> {
    action: &'static str,
    effect: Effect,
    principal: &'a Principal,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TrustPolicy<'a> {
    statement: Vec<TrustStatement<'a>>,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InlinePolicy<'a> {
    policy_document: &'a PolicyDocument,
    policy_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RoleProperties<'a> {
    assume_role_policy_document: TrustPolicy<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    managed_policy_arns: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    policies: Vec<InlinePolicy<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role_name: Option<&'a Value>,
}

impl CfnResource for Role {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Role
    }

    fn logical_id(&self) -> LogicalId<()> {
        self.id.erase()
    }

    fn validate(&self) -> Result<(), StackError> {
        if self.assumed_by.is_empty() {
            return Err(StackError::InvalidPrincipal(format!(
                "role {} is not assumable by any principal",
                self.id
            )));
        }
        for principal in &self.assumed_by {
            principal.validate()?;
        }

        if let Some(name) = self.role_name.as_ref().and_then(Value::as_literal) {
            if !ROLE_NAME.is_match(name) {
                return Err(StackError::InvalidFormat(format!(
                    "role name '{name}' of {} is not a valid role name",
                    self.id
                )));
            }
        }

        if let Some(path) = &self.path {
            if !path.starts_with('/') || !path.ends_with('/') {
                return Err(StackError::InvalidFormat(format!(
                    "role path '{path}' of {} must start and end with '/'",
                    self.id
                )));
            }
        }

        for (name, document) in &self.inline_policies {
            if document.is_empty() {
                return Err(StackError::InvalidStatement(format!(
                    "inline policy {name} of {} has no statements",
                    self.id
                )));
            }
            document.validate().map_err(|e| match e {
                StackError::InvalidStatement(msg) => {
                    StackError::InvalidStatement(format!("{} / {name}: {msg}", self.id))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    fn cfn_properties(&self) -> Result<serde_json::Value, StackError> {
        let managed_policy_arns = self
            .managed_policies
            .iter()
            .map(ManagedPolicyRef::arn)
            .collect::<Result<Vec<_>, _>>()?;

        let props = RoleProperties {
            assume_role_policy_document: TrustPolicy {
                statement: self
                    .assumed_by
                    .iter()
                    .map(|principal| TrustStatement {
                        action: "sts:AssumeRole",
                        effect: Effect::Allow,
                        principal,
                    })
                    .collect(),
                version: POLICY_VERSION,
            },
            managed_policy_arns,
            path: self.path.as_deref(),
            policies: self
                .inline_policies
                .iter()
                .map(|(name, document)| InlinePolicy {
                    policy_document: document,
                    policy_name: name,
                })
                .collect(),
            role_name: self.role_name.as_ref(),
        };
        Ok(serde_json::to_value(props)?)
    }
}
