//! The synthesized artifact handed to the provisioning engine.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::StackError;
use crate::types::{Pseudo, ResourceType};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Template parameter type that resolves a parameter-store path at deploy time.
pub const SSM_STRING_PARAMETER_TYPE: &str = "AWS::SSM::Parameter::Value<String>";

/// A template-level input parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateParameter {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TemplateParameter {
    /// A parameter resolved from the parameter store by `path`.
    pub fn ssm_string(path: impl Into<String>) -> Self {
        TemplateParameter {
            kind: SSM_STRING_PARAMETER_TYPE.to_string(),
            default: Some(path.into()),
            description: None,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// One entry of `Resources`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceDecl {
    #[serde(rename = "Type")]
    resource_type: String,
    properties: serde_json::Value,
}

impl ResourceDecl {
    pub fn new(resource_type: ResourceType, properties: serde_json::Value) -> Self {
        ResourceDecl {
            resource_type: resource_type.to_string(),
            properties,
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn properties(&self) -> &serde_json::Value {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }

    /// Logical ids this resource refers to through `Ref` or `Fn::GetAtt`.
    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_refs(&self.properties, &mut out);
        out
    }
}

fn collect_refs(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if map.len() == 1 {
                if let Some(serde_json::Value::String(target)) = map.get("Ref") {
                    out.push(target.clone());
                    return;
                }
                if let Some(serde_json::Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(serde_json::Value::String(target)) = args.first() {
                        out.push(target.clone());
                    }
                    return;
                }
            }
            map.values().for_each(|v| collect_refs(v, out));
        }
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}

/// A CloudFormation template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "Parameters", skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, TemplateParameter>,
    #[serde(rename = "Resources")]
    resources: BTreeMap<String, ResourceDecl>,
}

impl Template {
    pub(crate) fn new(description: Option<String>) -> Self {
        Template {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description,
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
        }
    }

    pub(crate) fn add_parameter(
        &mut self,
        logical_id: &str,
        parameter: TemplateParameter,
    ) -> Result<(), StackError> {
        if self.parameters.contains_key(logical_id) || self.resources.contains_key(logical_id) {
            return Err(StackError::DuplicateLogicalId(logical_id.to_string()));
        }
        self.parameters.insert(logical_id.to_string(), parameter);
        Ok(())
    }

    pub(crate) fn add_resource(
        &mut self,
        logical_id: &str,
        resource: ResourceDecl,
    ) -> Result<(), StackError> {
        if self.parameters.contains_key(logical_id) || self.resources.contains_key(logical_id) {
            return Err(StackError::DuplicateLogicalId(logical_id.to_string()));
        }
        self.resources.insert(logical_id.to_string(), resource);
        Ok(())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> &BTreeMap<String, TemplateParameter> {
        &self.parameters
    }

    pub fn resources(&self) -> &BTreeMap<String, ResourceDecl> {
        &self.resources
    }

    pub fn resource(&self, logical_id: &str) -> Option<&ResourceDecl> {
        self.resources.get(logical_id)
    }

    pub fn resources_of_type(
        &self,
        resource_type: ResourceType,
    ) -> impl Iterator<Item = (&String, &ResourceDecl)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type.as_ref())
    }

    /// Every `Ref` must name a resource, a template parameter or a pseudo
    /// parameter, and no resource may refer to itself.
    pub fn check_references(&self) -> Result<(), StackError> {
        for (id, resource) in &self.resources {
            for target in resource.references() {
                let known = Pseudo::from_str(&target).is_ok()
                    || self.parameters.contains_key(&target)
                    || self.resources.contains_key(&target);
                if !known || &target == id {
                    return Err(StackError::UnresolvedReference {
                        target,
                        source_id: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, StackError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, StackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the compact rendering; equal templates give equal fingerprints.
    pub fn fingerprint(&self) -> Result<String, StackError> {
        let json = self.to_json()?;
        Ok(format!("{:x}", Sha256::digest(json.as_bytes())))
    }
}
