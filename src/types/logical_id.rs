//! Typed logical identifiers for template resources.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::StackError;

use super::value::Value;

/// Marker type for roles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleMarker {}

/// Marker type for managed policies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyMarker {}

/// Marker type for users
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserMarker {}

/// Marker type for automation documents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentMarker {}

/// Marker type for parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterMarker {}

/// The template key of a resource, derived from the construct id it was
/// declared with. The marker keeps a role handle from being passed where a
/// user handle is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalId<T> {
    construct_id: String,
    id: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> LogicalId<T> {
    /// Derive a logical id by keeping only the ASCII alphanumerics of the
    /// construct id, e.g. `ami-update-document` becomes `amiupdatedocument`.
    pub fn new(construct_id: impl Into<String>) -> Result<Self, StackError> {
        let construct_id = construct_id.into();
        let id = sanitize(&construct_id);
        if id.is_empty() {
            return Err(StackError::InvalidFormat(format!(
                "construct id '{construct_id}' has no alphanumeric characters"
            )));
        }
        Ok(LogicalId {
            construct_id,
            id,
            _marker: PhantomData,
        })
    }

    /// The template key.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The id the construct was declared with.
    pub fn construct_id(&self) -> &str {
        &self.construct_id
    }

    /// A `Ref` to this resource.
    pub fn to_ref(&self) -> Value {
        Value::reference(self.id.clone())
    }

    /// Drop the marker, for code that handles every resource kind alike.
    pub fn erase(&self) -> LogicalId<()> {
        LogicalId {
            construct_id: self.construct_id.clone(),
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

pub(crate) fn sanitize(construct_id: &str) -> String {
    construct_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

impl<T> Display for LogicalId<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.id)
    }
}

/// A role's logical id.
pub type RoleId = LogicalId<RoleMarker>;

/// A managed policy's logical id.
pub type PolicyId = LogicalId<PolicyMarker>;

/// A user's logical id.
pub type UserId = LogicalId<UserMarker>;

/// An automation document's logical id.
pub type DocumentId = LogicalId<DocumentMarker>;

/// A parameter's logical id.
pub type ParameterId = LogicalId<ParameterMarker>;

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        camel_case = { "autoAdminRole", "autoAdminRole" },
        dashes = { "ami-update-document", "amiupdatedocument" },
        slashes_and_dots = { "a/b.c_d", "abcd" },
        digits = { "role-2", "role2" },
    )]
    fn test_logical_id_sanitizes_construct_id(construct_id: &str, expected: &str) {
        let id: RoleId = LogicalId::new(construct_id).unwrap();
        assert_eq!(id.id(), expected);
        assert_eq!(id.construct_id(), construct_id);
        assert_eq!(id.to_string(), expected);
    }

    #[test]
    fn test_logical_id_rejects_empty() {
        let err = UserId::new("--").unwrap_err();
        assert!(matches!(err, StackError::InvalidFormat(_)));
    }

    #[test]
    fn test_logical_id_to_ref() {
        let id = DocumentId::new("ami-update-document").unwrap();
        assert_eq!(id.to_ref(), Value::reference("amiupdatedocument"));
    }

    #[test]
    fn test_logical_id_erase_keeps_ids() {
        let id = PolicyId::new("test-managed-policy").unwrap();
        let erased = id.erase();
        assert_eq!(erased.id(), "testmanagedpolicy");
        assert_eq!(erased.construct_id(), "test-managed-policy");
    }
}
