use crate::error::StackError;
use crate::template::ResourceDecl;
use crate::types::{LogicalId, ResourceType};

/// Anything that can be declared as a template resource, e.g. a role, a
/// managed policy or an automation document.
pub trait CfnResource {
    /// The CloudFormation type (`AWS::IAM::Role`, ...)
    fn resource_type(&self) -> ResourceType;

    /// The template key this resource is declared under
    fn logical_id(&self) -> LogicalId<()>;

    /// Check local invariants before rendering, nothing to check by default
    fn validate(&self) -> Result<(), StackError> {
        Ok(())
    }

    /// Build the `Properties` block
    fn cfn_properties(&self) -> Result<serde_json::Value, StackError>;

    /// Build the full resource declaration, validating first
    fn cfn_resource(&self) -> Result<ResourceDecl, StackError> {
        self.validate()?;
        Ok(ResourceDecl::new(
            self.resource_type(),
            self.cfn_properties()?,
        ))
    }
}
