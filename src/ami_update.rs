//! The AMI update stack: cross-account automation roles, a limited operator
//! identity, the document that records a new image id, and the parameters
//! downstream deployments read.
//!
//! Resources are declared in dependency order:
//!
//! 1. `autoAdminRole`: assumed by the automation service, may assume the
//!    worker role in any account.
//! 2. `test-managed-policy`: resource-group listing plus passing the worker role.
//! 3. `automasterrole`: the worker role, trusted by the automation account
//!    and the automation service.
//! 4. `automation-user` and `roleToAssume`: a user that may only drive
//!    automations through the restricted role.
//! 5. `ami-update-document`: reads `/amis/{{ ImageName }}/id` and writes
//!    `/amis/{{ ImageName }}/id-new`.
//! 6. Three parameters holding the current image id and the document name.

use tracing::info;

use crate::config::StackConfig;
use crate::error::StackError;
use crate::stack::Stack;
use crate::types::{
    ArnComponents, AutomationDocument, DataKind, DocumentContent, DocumentId, DocumentParameter,
    ManagedPolicy, ManagedPolicyRef, ParameterDataType, ParameterId, ParameterTier, ParameterType,
    PolicyDocument, PolicyId, PolicyStatement, Principal, Role, RoleId, Step, StringParameter,
    User, UserId, Value, interpolate,
};

pub const WORKER_ROLE_PREFIX: &str = "AWS-SystemsManager-AutomationExecutionRole-";
pub const ADMIN_ROLE_PREFIX: &str = "AWS-SystemsManager-AutomationAdministrationRole-";
pub const RESTRICTED_ROLE_PREFIX: &str = "Automation-Restricted-";
pub const AUTOMATION_SERVICE_ROLE_POLICY: &str = "service-role/AmazonSSMAutomationRole";

pub const EXECUTION_POLICY_NAME: &str = "ExecutionPolicy";
pub const LIMITED_POLICY_NAME: &str = "limited-actions";

pub const WINDOWS_IMAGE_PARAMETER: &str = "/amis/windows/id";
pub const WINDOWS_TEST_IMAGE_PARAMETER: &str = "/amis/windows-test/id";
pub const DEPLOY_DOCUMENT_PARAMETER: &str = "/ci-deploy/ci-deploy-document";

/// Everything a limited operator may do with automations.
pub const LIMITED_ACTIONS: [&str; 8] = [
    "ssm:DescribeAutomationExecutions",
    "ssm:DescribeAutomationStepExecutions",
    "ssm:DescribeDocument",
    "ssm:GetAutomationExecution",
    "ssm:GetDocument",
    "ssm:ListDocuments",
    "ssm:ListDocumentVersions",
    "ssm:StartAutomationExecution",
];

/// Name of the role automations run as in every target account.
pub fn worker_role_name() -> Value {
    Value::concat([Value::literal(WORKER_ROLE_PREFIX), Value::region()])
}

/// Name of the role that drives automations from the automation account.
pub fn admin_role_name() -> Value {
    Value::concat([Value::literal(ADMIN_ROLE_PREFIX), Value::region()])
}

pub fn restricted_role_name() -> Value {
    Value::concat([Value::literal(RESTRICTED_ROLE_PREFIX), Value::region()])
}

/// The built stack plus handles to the resources it declares.
#[derive(Debug, Clone)]
pub struct AmiUpdateStack {
    pub stack: Stack,
    pub admin_role: RoleId,
    pub managed_policy: PolicyId,
    pub worker_role: RoleId,
    pub user: UserId,
    pub restricted_role: RoleId,
    pub document: DocumentId,
    /// The resolved image id: a template parameter `Ref` or a pinned literal
    pub image_id: Value,
    pub windows_parameter: ParameterId,
    pub testing_parameter: ParameterId,
    pub document_parameter: ParameterId,
}

/// Declare the AMI update stack described by `config`.
pub fn build(config: &StackConfig) -> Result<AmiUpdateStack, StackError> {
    let mut stack = Stack::new(config.stack_name.clone(), config.context());
    if let Some(description) = &config.description {
        stack = stack.with_description(description.clone());
    }
    let account = config.automation_account_id.as_str();

    let admin_role = stack.add_role(
        Role::new("autoAdminRole", [Principal::service(&config.service_principal)])?
            .with_name(admin_role_name())
            .with_inline_policy(
                EXECUTION_POLICY_NAME,
                PolicyDocument::new([
                    PolicyStatement::allow(
                        ["sts:AssumeRole"],
                        [ArnComponents::iam("role", "*", worker_role_name())
                            .with_partition("aws")
                            .format()?],
                    ),
                    PolicyStatement::allow(["organizations:ListAccountsForParent"], ["*"]),
                ]),
            ),
    )?;

    let worker_statements = worker_statements(account)?;
    let managed_policy = stack.add_managed_policy(ManagedPolicy::new(
        "test-managed-policy",
        worker_statements.clone(),
    )?)?;

    let mut worker = Role::new(
        "automasterrole",
        [
            Principal::account(account),
            Principal::service(&config.service_principal),
        ],
    )?
    .with_name(worker_role_name())
    .with_managed_policy(ManagedPolicyRef::aws_managed(AUTOMATION_SERVICE_ROLE_POLICY))
    .with_managed_policy(ManagedPolicyRef::from(&managed_policy))
    .with_path("/");
    if config.compat.worker_inline_policy {
        worker = worker.with_inline_policy(
            EXECUTION_POLICY_NAME,
            PolicyDocument::new(worker_statements),
        );
    }
    let worker_role = stack.add_role(worker)?;

    let user = User::new("automation-user")?.with_name(&config.limited_user_name);
    let user_arn = ArnComponents::iam("user", account, user.name_ref()).format()?;
    let user = stack.add_user(user)?;

    let restricted_role = stack.add_role(
        Role::new("roleToAssume", [Principal::arn(user_arn)])?
            .with_name(restricted_role_name())
            .with_inline_policy(
                LIMITED_POLICY_NAME,
                PolicyDocument::new([
                    PolicyStatement::allow(LIMITED_ACTIONS, ["*"]),
                    PolicyStatement::allow(
                        ["iam:PassRole"],
                        [ArnComponents::iam("role", account, admin_role_name()).format()?],
                    ),
                ]),
            ),
    )?;

    let document = stack.add_document(AutomationDocument::new(
        "ami-update-document",
        update_document_content(),
    )?)?;

    let image_id = stack.value_for_string_parameter(&config.image_parameter_path)?;
    info!(
        event = "Lookup",
        phase = "Resolved",
        path = config.image_parameter_path.as_str(),
        value = %image_id
    );

    let windows_parameter = stack.add_parameter(
        StringParameter::new("ami-windows-parameter", WINDOWS_IMAGE_PARAMETER, &image_id)?
            .with_description("The AMI ID for the Windows image")
            .with_tier(ParameterTier::Standard),
    )?;

    let testing_parameter = stack.add_parameter(
        StringParameter::new("ami-testing", WINDOWS_TEST_IMAGE_PARAMETER, &image_id)?
            .with_description("Testing ami data type")
            .with_kind(ParameterType::String)
            .with_data_type(ParameterDataType::Ec2Image),
    )?;

    let document_parameter = stack.add_parameter(
        StringParameter::new(
            "ami-deploy-document-parameter",
            DEPLOY_DOCUMENT_PARAMETER,
            document.to_ref(),
        )?
        .with_description("The name of the SSM document for rolling out new AMI's")
        .with_tier(ParameterTier::Standard),
    )?;

    Ok(AmiUpdateStack {
        stack,
        admin_role,
        managed_policy,
        worker_role,
        user,
        restricted_role,
        document,
        image_id,
        windows_parameter,
        testing_parameter,
        document_parameter,
    })
}

/// Statements the worker role needs beyond the AWS managed automation policy.
fn worker_statements(account: &str) -> Result<Vec<PolicyStatement>, StackError> {
    Ok(vec![
        PolicyStatement::allow(
            ["resource-groups:ListGroupResources", "tag:GetResources"],
            ["*"],
        ),
        PolicyStatement::allow(
            ["iam:PassRole"],
            [ArnComponents::iam("role", account, worker_role_name()).format()?],
        ),
    ])
}

/// Reads the current image id of `ImageName`, then writes `AmiID` next to it.
pub fn update_document_content() -> DocumentContent {
    let get_current = Step::execute_aws_api("getCurrentValue", "ssm", "GetParameter")
        .input("Name", format!("/amis/{}/id", interpolate("ImageName")))
        .output("value", "$.Parameter.Value", DataKind::String);

    let put_new = Step::execute_aws_api("putNewVersion", "ssm", "PutParameter")
        .input("Name", format!("/amis/{}/id-new", interpolate("ImageName")))
        .input("Overwrite", true)
        .input("Value", interpolate("AmiID"))
        .input("Type", "String");

    DocumentContent::new("Updates Parameter store with the latest AMI for specific images")
        .with_assume_role("AutomationAssumeRole")
        .with_parameter(
            "AutomationAssumeRole",
            DocumentParameter::string(
                "(Optional) The ARN of the role that allows Automation to perform the actions on your behalf",
            ),
        )
        .with_parameter(
            "AmiID",
            DocumentParameter::string("(Required) The image ID for the new AMI"),
        )
        .with_parameter(
            "ImageName",
            DocumentParameter::string(
                "(Required) The name of the image which should have the AMI ID updated.",
            ),
        )
        .with_step(get_current)
        .with_step(put_new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepAction;
    use std::collections::BTreeSet;

    const PINNED_IMAGE: &str = "ami-0123456789abcdef0";

    fn built() -> AmiUpdateStack {
        build(&StackConfig::default()).unwrap()
    }

    #[test]
    fn test_role_names() {
        assert_eq!(
            worker_role_name().to_string(),
            "AWS-SystemsManager-AutomationExecutionRole-${Token[AWS::Region]}"
        );
        assert_eq!(
            admin_role_name().to_string(),
            "AWS-SystemsManager-AutomationAdministrationRole-${Token[AWS::Region]}"
        );
    }

    #[test]
    fn test_trust_principals() {
        let built = built();
        let stack = &built.stack;

        let admin = stack.role(&built.admin_role).unwrap();
        assert_eq!(admin.assumed_by(), [Principal::service("ssm.amazonaws.com")]);

        let worker = stack.role(&built.worker_role).unwrap();
        assert_eq!(
            worker.assumed_by(),
            [
                Principal::account("123456789"),
                Principal::service("ssm.amazonaws.com")
            ]
        );

        let restricted = stack.role(&built.restricted_role).unwrap();
        let user_ref = Value::reference("automationuser");
        assert_eq!(
            restricted.assumed_by(),
            [Principal::arn(Value::concat([
                Value::literal("arn:"),
                Value::partition(),
                Value::literal(":iam::123456789:user/"),
                user_ref,
            ]))]
        );
    }

    #[test]
    fn test_worker_grants() {
        let built = built();
        let stack = &built.stack;
        let worker = stack.role(&built.worker_role).unwrap();

        assert!(worker.inline_policies().is_empty());
        assert_eq!(worker.path(), Some("/"));
        assert!(
            worker
                .managed_policies()
                .contains(&ManagedPolicyRef::aws_managed(AUTOMATION_SERVICE_ROLE_POLICY))
        );

        let grants: BTreeSet<(String, String)> = worker
            .managed_policies()
            .iter()
            .filter_map(|r| match r {
                ManagedPolicyRef::Local(id) => stack.managed_policy(id),
                ManagedPolicyRef::AwsManaged(_) => None,
            })
            .flat_map(|p| p.document().statements().to_vec())
            .flat_map(|s| {
                s.grants()
                    .map(|(a, r)| (a.to_string(), r.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();

        let worker_arn =
            "arn:${Token[AWS::Partition]}:iam::123456789:role/AWS-SystemsManager-AutomationExecutionRole-${Token[AWS::Region]}";
        let expected: BTreeSet<(String, String)> = [
            ("resource-groups:ListGroupResources", "*"),
            ("tag:GetResources", "*"),
            ("iam:PassRole", worker_arn),
        ]
        .into_iter()
        .map(|(a, r)| (a.to_string(), r.to_string()))
        .collect();
        assert_eq!(grants, expected);
        assert!(!grants.contains(&("iam:PassRole".to_string(), "*".to_string())));
    }

    #[test]
    fn test_restricted_role_actions() {
        let built = built();
        let restricted = built.stack.role(&built.restricted_role).unwrap();
        let policy = &restricted.inline_policies()[LIMITED_POLICY_NAME];

        let actions: BTreeSet<&str> = policy
            .statements()
            .iter()
            .flat_map(|s| s.actions().iter().map(String::as_str))
            .collect();
        let mut expected: BTreeSet<&str> = LIMITED_ACTIONS.into_iter().collect();
        expected.insert("iam:PassRole");
        assert_eq!(actions, expected);

        let pass_role = &policy.statements()[1];
        assert_eq!(
            pass_role.resources()[0].to_string(),
            "arn:${Token[AWS::Partition]}:iam::123456789:role/AWS-SystemsManager-AutomationAdministrationRole-${Token[AWS::Region]}"
        );
        assert_eq!(
            restricted.role_name().unwrap().to_string(),
            "Automation-Restricted-${Token[AWS::Region]}"
        );
    }

    #[test]
    fn test_admin_may_assume_worker_in_any_account() {
        let built = built();
        let admin = built.stack.role(&built.admin_role).unwrap();
        let statements = admin.inline_policies()[EXECUTION_POLICY_NAME].statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].actions(), ["sts:AssumeRole"]);
        assert_eq!(
            statements[0].resources()[0].to_string(),
            "arn:aws:iam::*:role/AWS-SystemsManager-AutomationExecutionRole-${Token[AWS::Region]}"
        );
        assert_eq!(statements[1].actions(), ["organizations:ListAccountsForParent"]);
    }

    #[test]
    fn test_document_has_two_steps_in_order() {
        let built = built();
        let document = built.stack.document(&built.document).unwrap();
        let steps = document.content().steps();
        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["getCurrentValue", "putNewVersion"]);
        assert!(steps.iter().all(|s| s.action() == StepAction::ExecuteAwsApi));
        assert!(document.content().validate().is_ok());
    }

    #[test]
    fn test_document_content_snapshot() {
        let content = serde_json::to_value(update_document_content()).unwrap();
        insta::with_settings!({sort_maps => true}, {
            insta::assert_json_snapshot!("ami_update_document_content", content);
        });
    }

    #[test]
    fn test_pinned_lookup_flows_into_parameters() {
        let mut config = StackConfig::default();
        config.pin(config.image_parameter_path.clone(), PINNED_IMAGE);
        let built = build(&config).unwrap();
        let stack = &built.stack;

        assert_eq!(built.image_id, Value::literal(PINNED_IMAGE));
        let windows = stack.parameter(&built.windows_parameter).unwrap();
        assert_eq!(windows.name(), WINDOWS_IMAGE_PARAMETER);
        assert_eq!(windows.value(), &Value::literal(PINNED_IMAGE));
        assert_eq!(windows.tier(), Some(ParameterTier::Standard));

        let testing = stack.parameter(&built.testing_parameter).unwrap();
        assert_eq!(testing.value(), &Value::literal(PINNED_IMAGE));
        assert_eq!(testing.data_type(), Some(ParameterDataType::Ec2Image));

        let deploy = stack.parameter(&built.document_parameter).unwrap();
        assert_eq!(deploy.value(), &Value::reference("amiupdatedocument"));

        let template = stack.synth().unwrap();
        assert!(template.parameters().is_empty());
    }

    #[test]
    fn test_deferred_lookup_is_declared_once() {
        let built = built();
        assert_eq!(
            built.image_id,
            Value::reference(
                "SsmParameterValueawsserviceamiwindowslatestWindowsServer2019EnglishFullECSOptimizedimageidParameter"
            )
        );
        assert_eq!(built.stack.lookups().len(), 1);

        let windows = built.stack.parameter(&built.windows_parameter).unwrap();
        let testing = built.stack.parameter(&built.testing_parameter).unwrap();
        assert_eq!(windows.value(), &built.image_id);
        assert_eq!(testing.value(), &built.image_id);
    }

    #[test]
    fn test_compat_inline_policy_is_flagged() {
        let mut config = StackConfig::default();
        config.compat.worker_inline_policy = true;
        let compat = build(&config).unwrap();
        let worker = compat.stack.role(&compat.worker_role).unwrap();
        assert!(worker.inline_policies().contains_key(EXECUTION_POLICY_NAME));

        let lints = compat.stack.lint();
        assert_eq!(lints.len(), 2);
        assert!(compat.stack.synth().is_ok());
        assert!(built().stack.lint().is_empty());
    }
}
