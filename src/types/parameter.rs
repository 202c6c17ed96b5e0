//! Parameter-store entries written by the stack.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::StackError;
use crate::traits::CfnResource;

use super::logical_id::{LogicalId, ParameterId};
use super::resource_type::ResourceType;
use super::value::Value;

static PARAMETER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/?[A-Za-z0-9_.\-]+(/[A-Za-z0-9_.\-]+)*$").unwrap());
static IMAGE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ami-[0-9a-f]{8,17}$").unwrap());

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum ParameterType {
    #[default]
    String,
    StringList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ParameterTier {
    Standard,
    Advanced,
    #[serde(rename = "Intelligent-Tiering")]
    #[strum(serialize = "Intelligent-Tiering")]
    IntelligentTiering,
}

/// How the parameter store validates the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ParameterDataType {
    #[serde(rename = "text")]
    #[strum(serialize = "text")]
    Text,
    #[serde(rename = "aws:ec2:image")]
    #[strum(serialize = "aws:ec2:image")]
    Ec2Image,
}

/// A string parameter written to the parameter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringParameter {
    id: ParameterId,
    name: String,
    value: Value,
    kind: ParameterType,
    description: Option<String>,
    tier: Option<ParameterTier>,
    data_type: Option<ParameterDataType>,
}

impl StringParameter {
    pub fn new(
        construct_id: &str,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, StackError> {
        Ok(StringParameter {
            id: LogicalId::new(construct_id)?,
            name: name.into(),
            value: value.into(),
            kind: ParameterType::String,
            description: None,
            tier: None,
            data_type: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tier(mut self, tier: ParameterTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_data_type(mut self, data_type: ParameterDataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_kind(mut self, kind: ParameterType) -> Self {
        self.kind = kind;
        self
    }

    pub fn id(&self) -> &ParameterId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn tier(&self) -> Option<ParameterTier> {
        self.tier
    }

    pub fn data_type(&self) -> Option<ParameterDataType> {
        self.data_type
    }

    pub fn kind(&self) -> ParameterType {
        self.kind
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterProperties<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data_type: Option<ParameterDataType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier: Option<ParameterTier>,
    #[serde(rename = "Type")]
    kind: ParameterType,
    value: &'a Value,
}

impl CfnResource for StringParameter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Parameter
    }

    fn logical_id(&self) -> LogicalId<()> {
        self.id.erase()
    }

    fn validate(&self) -> Result<(), StackError> {
        if !PARAMETER_NAME.is_match(&self.name) {
            return Err(StackError::InvalidParameter(format!(
                "'{}' is not a valid parameter name",
                self.name
            )));
        }
        let lowered = self.name.trim_start_matches('/').to_ascii_lowercase();
        if lowered.starts_with("aws") || lowered.starts_with("ssm") {
            return Err(StackError::InvalidParameter(format!(
                "'{}' uses a reserved prefix",
                self.name
            )));
        }
        if let Some(literal) = self.value.as_literal() {
            if literal.is_empty() {
                return Err(StackError::InvalidParameter(format!(
                    "'{}' has an empty value",
                    self.name
                )));
            }
            if self.data_type == Some(ParameterDataType::Ec2Image) && !IMAGE_ID.is_match(literal) {
                return Err(StackError::InvalidParameter(format!(
                    "'{}' holds '{literal}', which is not an image id",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn cfn_properties(&self) -> Result<serde_json::Value, StackError> {
        Ok(serde_json::to_value(ParameterProperties {
            data_type: self.data_type,
            description: self.description.as_deref(),
            name: &self.name,
            tier: self.tier,
            kind: self.kind,
            value: &self.value,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use yare::parameterized;

    #[test]
    fn test_parameter_properties() {
        let p = StringParameter::new("ami-testing", "/amis/windows-test/id", "ami-0123456789abcdef0")
            .unwrap()
            .with_description("Testing ami data type")
            .with_data_type(ParameterDataType::Ec2Image);
        assert_eq!(
            p.cfn_properties().unwrap(),
            json!({
                "DataType": "aws:ec2:image",
                "Description": "Testing ami data type",
                "Name": "/amis/windows-test/id",
                "Type": "String",
                "Value": "ami-0123456789abcdef0"
            })
        );
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_tier_strings() {
        assert_eq!(
            serde_json::to_value(ParameterTier::IntelligentTiering).unwrap(),
            json!("Intelligent-Tiering")
        );
        assert_eq!(
            ParameterTier::from_str("Standard").unwrap(),
            ParameterTier::Standard
        );
        assert_eq!(ParameterDataType::Ec2Image.to_string(), "aws:ec2:image");
    }

    #[parameterized(
        spaces_in_name = { "/amis/windows id", "x", None },
        reserved_prefix = { "/aws/custom", "x", None },
        reserved_ssm_prefix = { "ssm-thing", "x", None },
        empty_value = { "/amis/windows/id", "", None },
        not_an_image = { "/amis/windows/id", "latest", Some(ParameterDataType::Ec2Image) },
    )]
    fn test_parameter_validate_rejects(name: &str, value: &str, data_type: Option<ParameterDataType>) {
        let mut p = StringParameter::new("p", name, value).unwrap();
        if let Some(data_type) = data_type {
            p = p.with_data_type(data_type);
        }
        assert!(matches!(p.validate(), Err(StackError::InvalidParameter(_))));
    }

    #[test]
    fn test_token_values_are_not_checked_locally() {
        let p = StringParameter::new("p", "/amis/windows/id", Value::reference("Lookup"))
            .unwrap()
            .with_data_type(ParameterDataType::Ec2Image);
        assert!(p.validate().is_ok());
    }
}
