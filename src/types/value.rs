//! String values that may be resolved only at deploy time.
//!
//! A [`Value`] is either a plain literal or a token understood by the
//! provisioning engine: a `Ref` to another resource or template parameter, a
//! pseudo parameter such as `AWS::Region`, or a concatenation of both.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};

/// Pseudo parameters provided by the provisioning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, StrumDisplay, EnumString)]
pub enum Pseudo {
    #[strum(serialize = "AWS::Region")]
    Region,
    #[strum(serialize = "AWS::Partition")]
    Partition,
}

/// A string-valued expression in a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Literal(String),
    /// Reference to a resource or template parameter by logical id.
    Ref(String),
    Pseudo(Pseudo),
    /// Concatenation with an empty delimiter.
    Join(Vec<Value>),
}

impl Value {
    pub fn literal(s: impl Into<String>) -> Self {
        Value::Literal(s.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Value::Ref(logical_id.into())
    }

    pub fn region() -> Self {
        Value::Pseudo(Pseudo::Region)
    }

    pub fn partition() -> Self {
        Value::Pseudo(Pseudo::Partition)
    }

    /// Concatenate parts, flattening nested joins and merging adjacent
    /// literals. A concatenation of literals only collapses to a literal.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut out: Vec<Value> = Vec::new();
        let mut stack: Vec<Value> = parts.into_iter().map(Into::into).collect();
        stack.reverse();

        while let Some(part) = stack.pop() {
            match part {
                Value::Join(inner) => stack.extend(inner.into_iter().rev()),
                Value::Literal(s) if s.is_empty() => {}
                Value::Literal(s) => match out.last_mut() {
                    Some(Value::Literal(prev)) => prev.push_str(&s),
                    _ => out.push(Value::Literal(s)),
                },
                other => out.push(other),
            }
        }

        match out.len() {
            0 => Value::Literal(String::new()),
            1 => out.remove(0),
            _ => Value::Join(out),
        }
    }

    /// The literal string, if this value contains no tokens.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Value::Literal(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_token(&self) -> bool {
        !matches!(self, Value::Literal(_))
    }

    /// Logical ids referenced through `Ref`, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Value::Ref(id) => vec![id.as_str()],
            Value::Join(parts) => parts.iter().flat_map(|p| p.references()).collect(),
            Value::Literal(_) | Value::Pseudo(_) => Vec::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Literal(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Literal(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Literal(s.clone())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl From<Pseudo> for Value {
    fn from(p: Pseudo) -> Self {
        Value::Pseudo(p)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::Literal(s) => write!(f, "{s}"),
            Value::Ref(id) => write!(f, "${{Token[Ref:{id}]}}"),
            Value::Pseudo(p) => write!(f, "${{Token[{p}]}}"),
            Value::Join(parts) => parts.iter().try_for_each(|p| write!(f, "{p}")),
        }
    }
}

struct JoinArgs<'a>(&'a [Value]);

impl Serialize for JoinArgs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ("", self.0).serialize(serializer)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Literal(s) => serializer.serialize_str(s),
            Value::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Value::Pseudo(p) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", p.as_ref())?;
                map.end()
            }
            Value::Join(parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &JoinArgs(parts))?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_concat_merges_adjacent_literals() {
        let v = Value::concat(["arn:", "aws", ":iam"]);
        assert_eq!(v, Value::literal("arn:aws:iam"));
    }

    #[test]
    fn test_concat_flattens_nested_joins() {
        let inner = Value::concat([Value::literal("a-"), Value::region()]);
        let v = Value::concat([Value::literal("x:"), inner, Value::literal("-z")]);
        assert_eq!(
            v,
            Value::Join(vec![
                Value::literal("x:a-"),
                Value::region(),
                Value::literal("-z")
            ])
        );
    }

    #[test]
    fn test_concat_of_single_token_is_the_token() {
        let v = Value::concat([Value::literal(""), Value::reference("Doc")]);
        assert_eq!(v, Value::reference("Doc"));
    }

    #[test]
    fn test_concat_of_nothing_is_empty_literal() {
        let v = Value::concat(Vec::<Value>::new());
        assert_eq!(v, Value::literal(""));
    }

    #[test]
    fn test_value_serializes_as_intrinsics() {
        let v = Value::concat([Value::literal("role-"), Value::region()]);
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({"Fn::Join": ["", ["role-", {"Ref": "AWS::Region"}]]})
        );
        assert_eq!(
            serde_json::to_value(Value::reference("amiupdatedocument")).unwrap(),
            json!({"Ref": "amiupdatedocument"})
        );
        assert_eq!(
            serde_json::to_value(Value::literal("plain")).unwrap(),
            json!("plain")
        );
    }

    #[test]
    fn test_value_display_marks_tokens() {
        let v = Value::concat([Value::literal("name-"), Value::region()]);
        assert_eq!(v.to_string(), "name-${Token[AWS::Region]}");
        assert_eq!(Value::reference("User").to_string(), "${Token[Ref:User]}");
    }

    #[test]
    fn test_references_walks_joins() {
        let v = Value::concat([
            Value::reference("A"),
            Value::literal("/"),
            Value::partition(),
            Value::reference("B"),
        ]);
        assert_eq!(v.references(), vec!["A", "B"]);
        assert!(v.is_token());
        assert!(Value::literal("x").as_literal().is_some());
    }
}
