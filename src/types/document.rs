//! Automation documents: versioned workflows of named, ordered steps.
//!
//! Steps read their inputs through interpolation tokens: `{{ Name }}` for a
//! document parameter and `{{ step.output }}` for an output of an earlier
//! step. Both are checked before the document is rendered.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::StackError;
use crate::traits::CfnResource;

use super::logical_id::{DocumentId, LogicalId};
use super::resource_type::ResourceType;

/// Schema version of automation documents.
pub const AUTOMATION_SCHEMA_VERSION: &str = "0.3";

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_:.\-]+)\s*\}\}").unwrap());
static STEP_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Render an interpolation token for a parameter or `step.output`.
pub fn interpolate(name: &str) -> String {
    format!("{{{{ {name} }}}}")
}

/// Names referenced through interpolation tokens in `text`.
pub fn interpolated_names(text: &str) -> Vec<&str> {
    INTERPOLATION
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display, EnumString)]
pub enum DocumentType {
    #[default]
    Automation,
}

/// Types of document parameters and step outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display, EnumString)]
pub enum DataKind {
    #[default]
    String,
}

/// The automation action a step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, AsRefStr, Display, EnumString)]
pub enum StepAction {
    #[serde(rename = "aws:executeAwsApi")]
    #[strum(serialize = "aws:executeAwsApi")]
    ExecuteAwsApi,
}

/// A typed input parameter of the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentParameter {
    #[serde(rename = "type")]
    kind: DataKind,
    description: String,
}

impl DocumentParameter {
    pub fn new(kind: DataKind, description: impl Into<String>) -> Self {
        DocumentParameter {
            kind,
            description: description.into(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(DataKind::String, description)
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }
}

/// Parameters in declaration order, rendered as a JSON object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentParameters(Vec<(String, DocumentParameter)>);

impl DocumentParameters {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&DocumentParameter> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for DocumentParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, param) in &self.0 {
            map.serialize_entry(name, param)?;
        }
        map.end()
    }
}

/// A named output a step captures from its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StepOutput {
    name: String,
    selector: String,
    #[serde(rename = "Type")]
    kind: DataKind,
}

impl StepOutput {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One step of `mainSteps`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    action: StepAction,
    name: String,
    inputs: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    outputs: Vec<StepOutput>,
}

impl Step {
    fn new(action: StepAction, name: impl Into<String>) -> Self {
        Step {
            action,
            name: name.into(),
            inputs: serde_json::Map::new(),
            outputs: Vec::new(),
        }
    }

    /// An `aws:executeAwsApi` step calling `api` on `service`.
    pub fn execute_aws_api(name: impl Into<String>, service: &str, api: &str) -> Self {
        Self::new(StepAction::ExecuteAwsApi, name)
            .input("Service", service)
            .input("Api", api)
    }

    pub fn input(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn output(mut self, name: impl Into<String>, selector: impl Into<String>, kind: DataKind) -> Self {
        self.outputs.push(StepOutput {
            name: name.into(),
            selector: selector.into(),
            kind,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> StepAction {
        self.action
    }

    pub fn inputs(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.inputs
    }

    pub fn outputs(&self) -> &[StepOutput] {
        &self.outputs
    }

    /// The interpolation token a later step uses to read `output`.
    pub fn output_token(&self, output: &str) -> String {
        interpolate(&format!("{}.{}", self.name, output))
    }
}

/// The document body, in the automation facility's own schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContent {
    schema_version: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    assume_role: Option<String>,
    parameters: DocumentParameters,
    main_steps: Vec<Step>,
}

impl DocumentContent {
    pub fn new(description: impl Into<String>) -> Self {
        DocumentContent {
            schema_version: AUTOMATION_SCHEMA_VERSION.to_string(),
            description: description.into(),
            assume_role: None,
            parameters: DocumentParameters::default(),
            main_steps: Vec::new(),
        }
    }

    /// Run the document as the role passed in `parameter`.
    pub fn with_assume_role(mut self, parameter: &str) -> Self {
        self.assume_role = Some(interpolate(parameter));
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, parameter: DocumentParameter) -> Self {
        self.parameters.0.push((name.into(), parameter));
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.main_steps.push(step);
        self
    }

    pub fn parameters(&self) -> &DocumentParameters {
        &self.parameters
    }

    pub fn steps(&self) -> &[Step] {
        &self.main_steps
    }

    pub fn assume_role(&self) -> Option<&str> {
        self.assume_role.as_deref()
    }

    /// Check step names and that every interpolation resolves to a declared
    /// parameter, an output of an earlier step, or a built-in variable.
    pub fn validate(&self) -> Result<(), StackError> {
        if self.main_steps.is_empty() {
            return Err(StackError::InvalidDocument("document has no steps".to_string()));
        }

        let mut seen = BTreeSet::new();
        for name in self.parameters.names() {
            if !seen.insert(name) {
                return Err(StackError::InvalidDocument(format!(
                    "parameter '{name}' is declared twice"
                )));
            }
        }

        if let Some(assume_role) = &self.assume_role {
            self.check_tokens("assumeRole", assume_role, &BTreeMap::new())?;
        }

        let mut outputs: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for step in &self.main_steps {
            if !STEP_NAME.is_match(&step.name) {
                return Err(StackError::InvalidDocument(format!(
                    "step name '{}' may only contain letters, digits and underscores",
                    step.name
                )));
            }
            if outputs.contains_key(step.name.as_str()) {
                return Err(StackError::InvalidDocument(format!(
                    "step '{}' is declared twice",
                    step.name
                )));
            }
            for value in step.inputs.values() {
                self.check_value(&step.name, value, &outputs)?;
            }
            outputs.insert(
                step.name.as_str(),
                step.outputs.iter().map(|o| o.name.as_str()).collect(),
            );
        }
        Ok(())
    }

    fn check_value(
        &self,
        step: &str,
        value: &serde_json::Value,
        outputs: &BTreeMap<&str, BTreeSet<&str>>,
    ) -> Result<(), StackError> {
        match value {
            serde_json::Value::String(s) => self.check_tokens(step, s, outputs),
            serde_json::Value::Array(items) => items
                .iter()
                .try_for_each(|v| self.check_value(step, v, outputs)),
            serde_json::Value::Object(map) => map
                .values()
                .try_for_each(|v| self.check_value(step, v, outputs)),
            _ => Ok(()),
        }
    }

    fn check_tokens(
        &self,
        location: &str,
        text: &str,
        outputs: &BTreeMap<&str, BTreeSet<&str>>,
    ) -> Result<(), StackError> {
        for name in interpolated_names(text) {
            if name.starts_with("global:") || name.starts_with("automation:") {
                continue;
            }
            let resolved = match name.split_once('.') {
                Some((step, output)) => outputs
                    .get(step)
                    .is_some_and(|names| names.contains(output)),
                None => self.parameters.get(name).is_some(),
            };
            if !resolved {
                return Err(StackError::InvalidDocument(format!(
                    "{location} references '{name}', which is neither a parameter nor an output of an earlier step"
                )));
            }
        }
        Ok(())
    }
}

/// A Systems Manager document resource.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationDocument {
    id: DocumentId,
    content: DocumentContent,
}

impl AutomationDocument {
    pub fn new(construct_id: &str, content: DocumentContent) -> Result<Self, StackError> {
        Ok(AutomationDocument {
            id: LogicalId::new(construct_id)?,
            content,
        })
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn content(&self) -> &DocumentContent {
        &self.content
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentProperties<'a> {
    content: &'a DocumentContent,
    document_type: DocumentType,
}

impl CfnResource for AutomationDocument {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Document
    }

    fn logical_id(&self) -> LogicalId<()> {
        self.id.erase()
    }

    fn validate(&self) -> Result<(), StackError> {
        self.content
            .validate()
            .map_err(|e| StackError::InvalidDocument(format!("{}: {e}", self.id)))
    }

    fn cfn_properties(&self) -> Result<serde_json::Value, StackError> {
        Ok(serde_json::to_value(DocumentProperties {
            content: &self.content,
            document_type: DocumentType::Automation,
        })?)
    }
}
