//! End-to-end synthesis tests
//!
//! Builds a realistic handler tree (REST endpoints, an rpc-style
//! endpoint, scheduled jobs, a token authorizer) and checks the
//! resolved configs and the synthesized template together.

use serde_json::json;
use stacksmith::{
    resolve, synthesize, Field, FuncConfig, FunctionCode, HandlerNode, HandlerOp, ResolveOptions,
    ResourceRef, Template,
};

/// Shared project-level settings, authored once at the root.
fn make_root_config() -> FuncConfig {
    let mut conf = FuncConfig::new();
    conf.runtime = Field::Set("python3.11".to_string());
    conf.code = Field::Set(FunctionCode::new("deploy-bucket", "app/0.0.1/source.zip"));
    conf.iam_role = Field::Set(ResourceRef::Ref("FuncExecRole".to_string()));
    conf.rest_api = Field::Set(ResourceRef::Ref("RestApi".to_string()));
    conf.memory_size = Field::Set(256);
    conf
}

/// The application tree: a REST branch, an rpc branch, scheduled jobs,
/// and a token-authorizer handler.
fn make_app_tree() -> HandlerNode {
    let mut rest_conf = FuncConfig::new();
    rest_conf.api_resource_enabled = Field::Set(true);
    rest_conf.api_method_enabled = Field::Set(true);
    rest_conf.cors_enabled = Field::Set(true);
    rest_conf.api_authorization_type = Field::Set("CUSTOM".to_string());
    rest_conf.api_authorizer = Field::Set(ResourceRef::Parameter("SharedAuthorizerId".to_string()));

    let mut users_conf = FuncConfig::new();
    users_conf.memory_size = Field::Set(1024);

    let mut rpc_conf = FuncConfig::new();
    rpc_conf.api_resource_enabled = Field::Set(true);
    rpc_conf.api_method_enabled = Field::Set(true);
    rpc_conf.api_integration_type = Field::Set("rpc".to_string());

    let mut heart_beat_conf = FuncConfig::new();
    heart_beat_conf.schedule_enabled = Field::Set(true);
    heart_beat_conf.schedule_expressions = Field::Set(vec!["rate(1 minute)".to_string()]);

    let mut backup_db_conf = FuncConfig::new();
    backup_db_conf.schedule_enabled = Field::Set(true);
    backup_db_conf.schedule_expressions = Field::Set(vec![
        "cron(0 2 * * ? *)".to_string(),
        "rate(12 hours)".to_string(),
    ]);

    let mut auth_conf = FuncConfig::new();
    auth_conf.authorizer_enabled = Field::Set(true);

    HandlerNode::new("handlers")
        .with_config(make_root_config())
        .with_child(
            HandlerNode::new("rest").with_config(rest_conf).with_child(
                HandlerNode::new("users")
                    .with_config(users_conf)
                    .with_op(HandlerOp::new("get"))
                    .with_op(HandlerOp::new("post")),
            ),
        )
        .with_child(
            HandlerNode::new("rpc")
                .with_config(rpc_conf)
                .with_child(HandlerNode::new("add_two").with_op(HandlerOp::new("handler"))),
        )
        .with_child(
            HandlerNode::new("sched")
                .with_child(
                    HandlerNode::new("heart_beat")
                        .with_config(heart_beat_conf)
                        .with_op(HandlerOp::new("handler")),
                )
                .with_child(
                    HandlerNode::new("backup_db")
                        .with_config(backup_db_conf)
                        .with_op(HandlerOp::new("handler")),
                ),
        )
        .with_child(
            HandlerNode::new("auth")
                .with_config(auth_conf)
                .with_op(HandlerOp::new("handler")),
        )
}

fn make_app_template() -> Template {
    let resolved = resolve(make_app_tree(), &ResolveOptions::default());
    synthesize(&resolved).expect("synthesis should succeed")
}

// =============================================================================
// Inheritance
// =============================================================================

#[test]
fn test_root_settings_reach_every_function() {
    let template = make_app_template();

    for id in [
        "FuncRestUsersGet",
        "FuncRpcAddTwoHandler",
        "FuncSchedHeartBeatHandler",
        "FuncAuthHandler",
    ] {
        let function = template.get(id).unwrap_or_else(|| panic!("missing {id}"));
        assert_eq!(function.properties["Runtime"], "python3.11", "{id}");
        assert_eq!(
            function.properties["Code"]["S3Bucket"], "deploy-bucket",
            "{id}"
        );
        assert_eq!(
            function.properties["Role"],
            json!({ "Fn::GetAtt": ["FuncExecRole", "Arn"] }),
            "{id}"
        );
    }
}

#[test]
fn test_closer_values_shadow_distant_ones() {
    let template = make_app_template();

    // The users node overrides the root's memory setting.
    let get = template.get("FuncRestUsersGet").unwrap();
    assert_eq!(get.properties["MemorySize"], 1024);
    // Siblings outside that subtree keep the root value.
    let heart_beat = template.get("FuncSchedHeartBeatHandler").unwrap();
    assert_eq!(heart_beat.properties["MemorySize"], 256);
}

#[test]
fn test_derived_function_names_follow_the_tree() {
    let template = make_app_template();

    let cases = [
        ("FuncRestUsersGet", "rest-users-get", "rest.users.get"),
        ("FuncRestUsersPost", "rest-users-post", "rest.users.post"),
        ("FuncRpcAddTwoHandler", "rpc-add-two", "rpc.add_two.handler"),
        (
            "FuncSchedHeartBeatHandler",
            "sched-heart-beat",
            "sched.heart_beat.handler",
        ),
        ("FuncAuthHandler", "auth", "auth.handler"),
    ];
    for (id, name, handler) in cases {
        let function = template.get(id).unwrap_or_else(|| panic!("missing {id}"));
        assert_eq!(function.properties["FunctionName"], name, "{id}");
        assert_eq!(function.properties["Handler"], handler, "{id}");
    }
}

// =============================================================================
// API surface
// =============================================================================

#[test]
fn test_endpoint_resources_chain_to_the_api_root() {
    let template = make_app_template();

    let rest = template.get("ApiResourceRest").unwrap();
    assert_eq!(
        rest.properties["ParentId"],
        json!({ "Fn::GetAtt": ["RestApi", "RootResourceId"] })
    );
    assert_eq!(rest.properties["PathPart"], "rest");

    let users = template.get("ApiResourceRestUsers").unwrap();
    assert_eq!(users.properties["ParentId"], json!({ "Ref": "ApiResourceRest" }));
    assert!(users.depends_on.contains(&"ApiResourceRest".to_string()));
}

#[test]
fn test_protected_methods_carry_the_shared_authorizer() {
    let template = make_app_template();

    let get = template.get("ApiMethodRestUsersGet").unwrap();
    assert_eq!(get.properties["HttpMethod"], "GET");
    assert_eq!(get.properties["AuthorizationType"], "CUSTOM");
    assert_eq!(
        get.properties["AuthorizerId"],
        json!({ "Ref": "SharedAuthorizerId" })
    );
    assert_eq!(get.properties["Integration"]["Type"], "AWS_PROXY");
    assert_eq!(
        get.depends_on,
        vec!["ApiResourceRestUsers", "FuncRestUsersGet"]
    );

    // Every routed method gets its invoke grant.
    let permission = template.get("ApiMethodPermissionRestUsersGet").unwrap();
    assert_eq!(permission.properties["Principal"], "apigateway.amazonaws.com");
}

#[test]
fn test_rpc_branch_uses_the_default_handler_op() {
    let template = make_app_template();

    let method = template.get("ApiMethodRpcAddTwoHandler").unwrap();
    assert_eq!(method.properties["HttpMethod"], "POST");
    assert_eq!(method.properties["Integration"]["Type"], "AWS");
    assert_eq!(method.properties["AuthorizationType"], "NONE");
}

#[test]
fn test_one_preflight_method_per_endpoint_path() {
    let template = make_app_template();

    // get and post both request CORS; the path keeps a single OPTIONS
    // method.
    let preflights: Vec<&str> = template
        .iter()
        .filter(|r| r.logical_id.starts_with("ApiMethodOptions"))
        .map(|r| r.logical_id.as_str())
        .collect();
    assert_eq!(preflights, vec!["ApiMethodOptionsRestUsers"]);

    let preflight = template.get("ApiMethodOptionsRestUsers").unwrap();
    assert_eq!(preflight.properties["HttpMethod"], "OPTIONS");
    let headers = preflight.properties["Integration"]["IntegrationResponses"][0]
        ["ResponseParameters"]["method.response.header.Access-Control-Allow-Headers"]
        .as_str()
        .unwrap();
    // Protected endpoints let the browser send the token header.
    assert!(headers.contains("auth"), "allow-headers was {headers}");
}

#[test]
fn test_token_authorizer_descriptor() {
    let template = make_app_template();

    let authorizer = template.get("ApiAuthorizerAuthHandler").unwrap();
    assert_eq!(authorizer.properties["Type"], "TOKEN");
    assert_eq!(authorizer.properties["Name"], "auth");
    assert_eq!(
        authorizer.properties["IdentitySource"],
        "method.request.header.auth"
    );
    assert!(authorizer
        .depends_on
        .contains(&"FuncAuthHandler".to_string()));
}

// =============================================================================
// Scheduled triggers
// =============================================================================

#[test]
fn test_one_rule_and_grant_per_schedule_expression() {
    let template = make_app_template();

    let backup_rules: Vec<&str> = template
        .iter()
        .filter(|r| r.logical_id.starts_with("EventRuleSchedBackupDb"))
        .map(|r| r.logical_id.as_str())
        .collect();
    assert_eq!(backup_rules.len(), 2, "two expressions, two rules");
    assert_ne!(backup_rules[0], backup_rules[1]);

    let backup_grants = template
        .iter()
        .filter(|r| r.logical_id.starts_with("EventRulePermissionSchedBackupDb"))
        .count();
    assert_eq!(backup_grants, 2);

    let heart_beat_rules = template
        .iter()
        .filter(|r| r.logical_id.starts_with("EventRuleSchedHeartBeat"))
        .count();
    assert_eq!(heart_beat_rules, 1);
}

#[test]
fn test_schedule_grants_point_at_their_rule() {
    let template = make_app_template();

    let rule = template
        .iter()
        .find(|r| r.logical_id.starts_with("EventRuleSchedHeartBeat"))
        .unwrap();
    let grant = template
        .iter()
        .find(|r| r.logical_id.starts_with("EventRulePermissionSchedHeartBeat"))
        .unwrap();

    assert_eq!(rule.properties["ScheduleExpression"], "rate(1 minute)");
    assert_eq!(
        grant.properties["SourceArn"],
        json!({ "Fn::GetAtt": [rule.logical_id, "Arn"] })
    );
    assert_eq!(grant.properties["Principal"], "events.amazonaws.com");
}

// =============================================================================
// Template discipline
// =============================================================================

#[test]
fn test_grouping_nodes_derive_no_functions() {
    let template = make_app_template();

    for id in ["FuncRest", "FuncRpc", "FuncSched", "FuncHandlers"] {
        assert!(!template.contains(id), "unexpected {id}");
    }
}

#[test]
fn test_synthesis_is_deterministic() {
    let opts = ResolveOptions::default();
    let first = synthesize(&resolve(make_app_tree(), &opts)).unwrap();
    let second = synthesize(&resolve(make_app_tree(), &opts)).unwrap();

    assert_eq!(first.to_value(), second.to_value());
    let first_ids: Vec<&str> = first.iter().map(|r| r.logical_id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|r| r.logical_id.as_str()).collect();
    assert_eq!(first_ids, second_ids, "insertion order is reproducible");
}

#[test]
fn test_rendered_template_shape() {
    let template = make_app_template();
    let value = template.to_value();

    let resources = value["Resources"].as_object().unwrap();
    assert_eq!(resources.len(), template.len());
    assert_eq!(
        resources["FuncRestUsersGet"]["Type"],
        "AWS::Lambda::Function"
    );
    assert_eq!(
        resources["ApiMethodOptionsRestUsers"]["Type"],
        "AWS::ApiGateway::Method"
    );
    assert_eq!(resources["ApiResourceRest"]["DependsOn"], json!(["RestApi"]));
}

#[test]
fn test_invalid_enum_value_aborts_synthesis() {
    let mut conf = make_root_config();
    conf.api_resource_enabled = Field::Set(true);
    conf.api_method_enabled = Field::Set(true);
    conf.api_integration_type = Field::Set("soap".to_string());

    let tree = HandlerNode::new("handlers").with_config(conf).with_child(
        HandlerNode::new("rest")
            .with_child(HandlerNode::new("users").with_op(HandlerOp::new("get"))),
    );
    let resolved = resolve(tree, &ResolveOptions::default());

    let err = synthesize(&resolved).unwrap_err();
    assert!(matches!(
        err,
        stacksmith::DeriveError::InvalidEnumValue { field: "api_integration_type", .. }
    ));
}

#[test]
fn test_missing_required_field_aborts_synthesis() {
    // No code artifact anywhere in the chain.
    let mut conf = FuncConfig::new();
    conf.runtime = Field::Set("python3.11".to_string());
    conf.iam_role = Field::Set(ResourceRef::Ref("FuncExecRole".to_string()));

    let tree = HandlerNode::new("handlers").with_config(conf).with_child(
        HandlerNode::new("sched")
            .with_child(HandlerNode::new("heart_beat").with_op(HandlerOp::new("handler"))),
    );
    let resolved = resolve(tree, &ResolveOptions::default());

    let err = synthesize(&resolved).unwrap_err();
    assert_eq!(
        err,
        stacksmith::DeriveError::MissingRequiredField { field: "code" }
    );
}
