//! Data model types for the resource graph and their template rendering.
//!
//! Canonical rendered forms:
//! - Values: literals as strings, tokens as `{"Ref": ...}` or `{"Fn::Join": ["", [...]]}`
//! - ARNs: `arn:{partition}:{service}:{region}:{account}:{resource}/{name}`
//! - Principals: `{"Service": "ssm.amazonaws.com"}` or `{"AWS": <arn>}`
//! - Statements: `Action`/`Resource` as a scalar when there is exactly one
//!
//! Logical ids are derived from construct ids by dropping every
//! non-alphanumeric character.

mod arn;
mod document;
mod logical_id;
mod managed_policy;
mod parameter;
mod principal;
mod resource_type;
mod role;
mod statement;
mod user;
mod value;

pub use arn::{Arn, ArnComponents, is_account_id};
pub use document::{
    AUTOMATION_SCHEMA_VERSION, AutomationDocument, DataKind, DocumentContent, DocumentParameter,
    DocumentParameters, DocumentType, Step, StepAction, StepOutput, interpolate,
    interpolated_names,
};
pub use logical_id::{
    DocumentId, DocumentMarker, LogicalId, ParameterId, ParameterMarker, PolicyId, PolicyMarker,
    RoleId, RoleMarker, UserId, UserMarker,
};
pub(crate) use logical_id::sanitize;
pub use managed_policy::{ManagedPolicy, ManagedPolicyRef};
pub use parameter::{ParameterDataType, ParameterTier, ParameterType, StringParameter};
pub use principal::Principal;
pub use resource_type::ResourceType;
pub use role::Role;
pub use statement::{Effect, POLICY_VERSION, PolicyDocument, PolicyStatement};
pub use user::User;
pub use value::{Pseudo, Value};
