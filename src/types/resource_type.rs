//! CloudFormation resource type names.
//!
//! This module centralizes the resource type strings emitted into templates
//! so the rest of the crate never spells them out by hand.

/// The CloudFormation resource types this stack declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    /// An IAM role (`AWS::IAM::Role`)
    Role,
    /// A customer managed IAM policy (`AWS::IAM::ManagedPolicy`)
    ManagedPolicy,
    /// An IAM user (`AWS::IAM::User`)
    User,
    /// A Systems Manager document (`AWS::SSM::Document`)
    Document,
    /// A Systems Manager parameter (`AWS::SSM::Parameter`)
    Parameter,
}

impl AsRef<str> for ResourceType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Role => "AWS::IAM::Role",
            Self::ManagedPolicy => "AWS::IAM::ManagedPolicy",
            Self::User => "AWS::IAM::User",
            Self::Document => "AWS::SSM::Document",
            Self::Parameter => "AWS::SSM::Parameter",
        }
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWS::IAM::Role" => Ok(Self::Role),
            "AWS::IAM::ManagedPolicy" => Ok(Self::ManagedPolicy),
            "AWS::IAM::User" => Ok(Self::User),
            "AWS::SSM::Document" => Ok(Self::Document),
            "AWS::SSM::Parameter" => Ok(Self::Parameter),
            _ => Err(format!("Unknown resource type: {}", s)),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use yare::parameterized;

    #[parameterized(
        role = { ResourceType::Role, "AWS::IAM::Role" },
        managed_policy = { ResourceType::ManagedPolicy, "AWS::IAM::ManagedPolicy" },
        user = { ResourceType::User, "AWS::IAM::User" },
        document = { ResourceType::Document, "AWS::SSM::Document" },
        parameter = { ResourceType::Parameter, "AWS::SSM::Parameter" },
    )]
    fn test_resource_type_round_trips_through_str(ty: ResourceType, literal: &str) {
        assert_eq!(ty.as_ref(), literal);
        assert_eq!(ty.to_string(), literal);
        assert_eq!(ResourceType::from_str(literal).unwrap(), ty);
    }

    #[test]
    fn test_resource_type_rejects_unknown() {
        assert!(ResourceType::from_str("AWS::S3::Bucket").is_err());
    }
}
