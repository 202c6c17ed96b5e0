use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use tracing::{debug, info, warn};

use crate::error::StackError;
use crate::template::{ResourceDecl, Template, TemplateParameter};
use crate::timers::{PhaseTimer, SynthTimings};
use crate::traits::CfnResource;
use crate::types::{
    AutomationDocument, DocumentId, LogicalId, ManagedPolicy, ManagedPolicyRef, ParameterId,
    PolicyId, ResourceType, Role, RoleId, StringParameter, User, UserId, Value, sanitize,
};

/// Values supplied by the environment the stack is built in.
///
/// Pinned lookups replace deploy-time parameter-store resolution with a
/// fixed value, so the synthesized template no longer depends on the
/// registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackContext {
    pinned: BTreeMap<String, String>,
}

impl StackContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pinned(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.pinned.insert(path.into(), value.into());
        self
    }

    pub fn pinned(&self, path: &str) -> Option<&str> {
        self.pinned.get(path).map(String::as_str)
    }
}

impl FromIterator<(String, String)> for StackContext {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        StackContext {
            pinned: iter.into_iter().collect(),
        }
    }
}

/// Any resource the stack can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Construct {
    Role(Role),
    ManagedPolicy(ManagedPolicy),
    User(User),
    Document(AutomationDocument),
    Parameter(StringParameter),
}

/// Dispatch the CfnResource trait to the wrapped resource.
impl CfnResource for Construct {
    fn resource_type(&self) -> ResourceType {
        match self {
            Construct::Role(r) => r.resource_type(),
            Construct::ManagedPolicy(p) => p.resource_type(),
            Construct::User(u) => u.resource_type(),
            Construct::Document(d) => d.resource_type(),
            Construct::Parameter(p) => p.resource_type(),
        }
    }

    fn logical_id(&self) -> LogicalId<()> {
        match self {
            Construct::Role(r) => r.logical_id(),
            Construct::ManagedPolicy(p) => p.logical_id(),
            Construct::User(u) => u.logical_id(),
            Construct::Document(d) => d.logical_id(),
            Construct::Parameter(p) => p.logical_id(),
        }
    }

    fn validate(&self) -> Result<(), StackError> {
        match self {
            Construct::Role(r) => r.validate(),
            Construct::ManagedPolicy(p) => p.validate(),
            Construct::User(u) => u.validate(),
            Construct::Document(d) => d.validate(),
            Construct::Parameter(p) => p.validate(),
        }
    }

    fn cfn_properties(&self) -> Result<serde_json::Value, StackError> {
        match self {
            Construct::Role(r) => r.cfn_properties(),
            Construct::ManagedPolicy(p) => p.cfn_properties(),
            Construct::User(u) => u.cfn_properties(),
            Construct::Document(d) => d.cfn_properties(),
            Construct::Parameter(p) => p.cfn_properties(),
        }
    }
}

/// Warnings about a graph that synthesizes but is probably not what was meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lint {
    /// An inline statement repeats a statement of a managed policy the same
    /// role already attaches.
    RedundantInlineStatement {
        role: String,
        policy_name: String,
        statement: usize,
        managed_policy: String,
    },
}

impl Display for Lint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Lint::RedundantInlineStatement {
                role,
                policy_name,
                statement,
                managed_policy,
            } => write!(
                f,
                "role {role}: statement {statement} of inline policy {policy_name} duplicates managed policy {managed_policy}"
            ),
        }
    }
}

/// The in-memory resource graph, in declaration order.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    context: StackContext,
    constructs: Vec<Construct>,
    lookups: BTreeMap<String, Value>,
    parameters: BTreeMap<String, TemplateParameter>,
}

impl Stack {
    pub fn new(name: impl Into<String>, context: StackContext) -> Self {
        Stack {
            name: name.into(),
            description: None,
            context,
            constructs: Vec::new(),
            lookups: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &StackContext {
        &self.context
    }

    pub fn constructs(&self) -> &[Construct] {
        &self.constructs
    }

    fn contains_id(&self, logical_id: &str) -> bool {
        self.parameters.contains_key(logical_id)
            || self
                .constructs
                .iter()
                .any(|c| c.logical_id().id() == logical_id)
    }

    fn add(&mut self, construct: Construct) -> Result<(), StackError> {
        let logical_id = construct.logical_id();
        if self.contains_id(logical_id.id()) {
            return Err(StackError::DuplicateLogicalId(logical_id.id().to_string()));
        }
        debug!(
            event = "Construct",
            phase = "Added",
            logical_id = logical_id.id(),
            construct_id = logical_id.construct_id(),
            resource_type = construct.resource_type().as_ref()
        );
        self.constructs.push(construct);
        Ok(())
    }

    pub fn add_role(&mut self, role: Role) -> Result<RoleId, StackError> {
        let id = role.id().clone();
        self.add(Construct::Role(role))?;
        Ok(id)
    }

    pub fn add_managed_policy(&mut self, policy: ManagedPolicy) -> Result<PolicyId, StackError> {
        let id = policy.id().clone();
        self.add(Construct::ManagedPolicy(policy))?;
        Ok(id)
    }

    pub fn add_user(&mut self, user: User) -> Result<UserId, StackError> {
        let id = user.id().clone();
        self.add(Construct::User(user))?;
        Ok(id)
    }

    pub fn add_document(&mut self, document: AutomationDocument) -> Result<DocumentId, StackError> {
        let id = document.id().clone();
        self.add(Construct::Document(document))?;
        Ok(id)
    }

    pub fn add_parameter(&mut self, parameter: StringParameter) -> Result<ParameterId, StackError> {
        let id = parameter.id().clone();
        self.add(Construct::Parameter(parameter))?;
        Ok(id)
    }

    /// Resolve a value from the external parameter registry by exact path.
    ///
    /// A pinned context value is used as a literal; otherwise the value is a
    /// deploy-time template parameter. Repeated lookups of one path return
    /// the same value and declare the parameter once.
    pub fn value_for_string_parameter(&mut self, path: &str) -> Result<Value, StackError> {
        if !path.starts_with('/') || path.len() < 2 {
            return Err(StackError::InvalidParameter(format!(
                "lookup path '{path}' must be an absolute parameter path"
            )));
        }
        if let Some(value) = self.lookups.get(path) {
            debug!(event = "Lookup", phase = "Reused", path = path);
            return Ok(value.clone());
        }

        let value = match self.context.pinned(path) {
            Some(pinned) => {
                debug!(event = "Lookup", phase = "Pinned", path = path, value = pinned);
                Value::literal(pinned)
            }
            None => {
                let logical_id = format!("SsmParameterValue{}Parameter", sanitize(path));
                if let Some(other) = self.parameters.get(&logical_id) {
                    return Err(StackError::InvalidParameter(format!(
                        "lookup paths '{}' and '{path}' both map to {logical_id}",
                        other.default_value().unwrap_or_default()
                    )));
                }
                if self.contains_id(&logical_id) {
                    return Err(StackError::DuplicateLogicalId(logical_id));
                }
                debug!(
                    event = "Lookup",
                    phase = "Deferred",
                    path = path,
                    logical_id = logical_id.as_str()
                );
                self.parameters
                    .insert(logical_id.clone(), TemplateParameter::ssm_string(path));
                Value::reference(logical_id)
            }
        };
        self.lookups.insert(path.to_string(), value.clone());
        Ok(value)
    }

    /// Resolved lookups by path.
    pub fn lookups(&self) -> &BTreeMap<String, Value> {
        &self.lookups
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.constructs.iter().filter_map(|c| match c {
            Construct::Role(r) => Some(r),
            _ => None,
        })
    }

    pub fn role(&self, id: &RoleId) -> Option<&Role> {
        self.roles().find(|r| r.id() == id)
    }

    pub fn managed_policy(&self, id: &PolicyId) -> Option<&ManagedPolicy> {
        self.constructs.iter().find_map(|c| match c {
            Construct::ManagedPolicy(p) if p.id() == id => Some(p),
            _ => None,
        })
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.constructs.iter().find_map(|c| match c {
            Construct::User(u) if u.id() == id => Some(u),
            _ => None,
        })
    }

    pub fn document(&self, id: &DocumentId) -> Option<&AutomationDocument> {
        self.constructs.iter().find_map(|c| match c {
            Construct::Document(d) if d.id() == id => Some(d),
            _ => None,
        })
    }

    pub fn string_parameters(&self) -> impl Iterator<Item = &StringParameter> {
        self.constructs.iter().filter_map(|c| match c {
            Construct::Parameter(p) => Some(p),
            _ => None,
        })
    }

    pub fn parameter(&self, id: &ParameterId) -> Option<&StringParameter> {
        self.string_parameters().find(|p| p.id() == id)
    }

    /// Warnings about redundancy in the graph; none of them stop synthesis.
    pub fn lint(&self) -> Vec<Lint> {
        let mut lints = Vec::new();
        for role in self.roles() {
            let attached: Vec<&ManagedPolicy> = role
                .managed_policies()
                .iter()
                .filter_map(|r| match r {
                    ManagedPolicyRef::Local(id) => self.managed_policy(id),
                    ManagedPolicyRef::AwsManaged(_) => None,
                })
                .collect();

            for (policy_name, document) in role.inline_policies() {
                for (idx, statement) in document.statements().iter().enumerate() {
                    let duplicate = attached.iter().find(|policy| {
                        policy
                            .document()
                            .statements()
                            .iter()
                            .any(|s| s.is_equivalent(statement))
                    });
                    if let Some(policy) = duplicate {
                        lints.push(Lint::RedundantInlineStatement {
                            role: role.id().to_string(),
                            policy_name: policy_name.clone(),
                            statement: idx,
                            managed_policy: policy.id().to_string(),
                        });
                    }
                }
            }
        }
        lints
    }

    fn check_unique_role_names(&self) -> Result<(), StackError> {
        let mut seen: BTreeMap<String, &RoleId> = BTreeMap::new();
        for role in self.roles() {
            let Some(name) = role.role_name() else {
                continue;
            };
            let rendered = name.to_string();
            if let Some(first) = seen.get(&rendered) {
                return Err(StackError::DuplicateName {
                    kind: "role".to_string(),
                    name: rendered,
                    first: first.to_string(),
                    second: role.id().to_string(),
                });
            }
            seen.insert(rendered, role.id());
        }
        Ok(())
    }

    /// Validate the graph and render it into a template.
    ///
    /// Any failure aborts synthesis as a whole; no partial template is returned.
    pub fn synth(&self) -> Result<Template, StackError> {
        let mut timings = SynthTimings::default();
        info!(
            event = "Synth",
            phase = "Start",
            stack = self.name.as_str(),
            constructs = self.constructs.len(),
            lookups = self.lookups.len()
        );

        {
            let _timer = PhaseTimer::new(&mut timings.validate);
            for construct in &self.constructs {
                construct.validate()?;
            }
            self.check_unique_role_names()?;
        }

        let mut template = Template::new(self.description.clone());
        {
            let _timer = PhaseTimer::new(&mut timings.render);
            for (logical_id, parameter) in &self.parameters {
                template.add_parameter(logical_id, parameter.clone())?;
            }
            for construct in &self.constructs {
                let decl = ResourceDecl::new(construct.resource_type(), construct.cfn_properties()?);
                template.add_resource(construct.logical_id().id(), decl)?;
            }
        }

        {
            let _timer = PhaseTimer::new(&mut timings.check_references);
            template.check_references()?;
        }

        for lint in self.lint() {
            warn!(event = "Synth", phase = "Lint", stack = self.name.as_str(), "{lint}");
        }

        debug!(
            event = "Synth",
            phase = "Timings",
            validate_ms = timings.validate.as_secs_f64() * 1000.0,
            render_ms = timings.render.as_secs_f64() * 1000.0,
            check_references_ms = timings.check_references.as_secs_f64() * 1000.0
        );
        info!(
            event = "Synth",
            phase = "Done",
            stack = self.name.as_str(),
            resources = template.resources().len(),
            parameters = template.parameters().len(),
            total_ms = timings.total_ms()
        );
        Ok(template)
    }
}
