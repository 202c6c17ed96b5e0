//! Identity policy statements and documents.

use std::str::FromStr;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{Display, EnumString};

use crate::error::StackError;

use super::arn::Arn;
use super::value::Value;

/// The IAM policy language version every document is written in.
pub const POLICY_VERSION: &str = "2012-10-17";

static ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\*|[a-z0-9-]+:[A-Za-z0-9*?]+)$").unwrap());

/// Whether a statement allows or denies its actions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// One statement of an identity policy: an effect over actions and resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PolicyStatement {
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn new<A, R>(effect: Effect, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<Value>,
    {
        PolicyStatement {
            effect,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// An `Allow` statement.
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<Value>,
    {
        Self::new(Effect::Allow, actions, resources)
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn resources(&self) -> &[Value] {
        &self.resources
    }

    /// Every statement needs at least one action and one resource; literal
    /// resources must be `*` or an ARN pattern.
    pub fn validate(&self) -> Result<(), StackError> {
        if self.actions.is_empty() {
            return Err(StackError::InvalidStatement(
                "statement has no actions".to_string(),
            ));
        }
        if self.resources.is_empty() {
            return Err(StackError::InvalidStatement(format!(
                "statement for [{}] has no resources",
                self.actions.join(", ")
            )));
        }
        if let Some(bad) = self.actions.iter().find(|a| !ACTION.is_match(a)) {
            return Err(StackError::InvalidStatement(format!(
                "'{bad}' is not of the form service:Operation"
            )));
        }
        for resource in &self.resources {
            if let Some(literal) = resource.as_literal() {
                if literal != "*" {
                    Arn::from_str(literal)
                        .map_err(|e| StackError::InvalidStatement(e.to_string()))?;
                }
            }
        }
        Ok(())
    }

    /// True when both statements grant the same effect over the same action
    /// and resource sets, ignoring order and repeats.
    pub fn is_equivalent(&self, other: &PolicyStatement) -> bool {
        fn key<T: Ord + Clone>(items: &[T]) -> Vec<T> {
            items.iter().cloned().sorted().dedup().collect()
        }
        self.effect == other.effect
            && key(&self.actions) == key(&other.actions)
            && key(&self.resources.iter().map(|r| r.to_string()).collect::<Vec<_>>())
                == key(&other.resources.iter().map(|r| r.to_string()).collect::<Vec<_>>())
    }

    /// Pairs of action and resource this statement covers.
    pub fn grants(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.actions
            .iter()
            .cartesian_product(self.resources.iter())
            .map(|(a, r)| (a.as_str(), r))
    }
}

/// Renders a one-element list as a scalar, like the policy language allows.
struct OneOrMany<'a, T>(&'a [T]);

impl<T: Serialize> Serialize for OneOrMany<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}

impl Serialize for PolicyStatement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("Action", &OneOrMany(&self.actions))?;
        map.serialize_entry("Effect", &self.effect)?;
        map.serialize_entry("Resource", &OneOrMany(&self.resources))?;
        map.end()
    }
}

/// An ordered list of statements under the current policy language version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: impl IntoIterator<Item = PolicyStatement>) -> Self {
        PolicyDocument {
            statements: statements.into_iter().collect(),
        }
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn validate(&self) -> Result<(), StackError> {
        for (idx, statement) in self.statements.iter().enumerate() {
            statement.validate().map_err(|e| match e {
                StackError::InvalidStatement(msg) => {
                    StackError::InvalidStatement(format!("statement {idx}: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("Statement", &self.statements)?;
        map.serialize_entry("Version", POLICY_VERSION)?;
        map.end()
    }
}
