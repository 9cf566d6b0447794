//! API-side resource kinds: endpoint resources, methods, CORS preflight
//! methods, invoke permissions, and token authorizers.

use serde_json::{json, Map, Value};
use std::rc::Rc;

use crate::config::{AuthorizationType, IntegrationType};
use crate::error::DeriveError;
use crate::naming::{logical_id, prefix};
use crate::resource::{Resource, ResourceKind};
use crate::tree::http_method;

use super::{flag, invoke_uri, ResourceConfig};

impl ResourceConfig {
    pub fn api_resource_logic_id(&self) -> String {
        logical_id(prefix::API_RESOURCE, self.rel_path(), None, None)
    }

    pub fn api_method_logic_id(&self) -> String {
        logical_id(prefix::API_METHOD, self.rel_path(), self.op_name(), None)
    }

    /// Shared by every operation on the node so the template keeps one
    /// preflight method per endpoint path.
    pub fn cors_method_logic_id(&self) -> String {
        logical_id(prefix::CORS_METHOD, self.rel_path(), None, None)
    }

    pub fn authorizer_logic_id(&self) -> String {
        logical_id(prefix::API_AUTHORIZER, self.rel_path(), self.op_name(), None)
    }

    pub fn method_permission_logic_id(&self) -> String {
        logical_id(
            prefix::METHOD_PERMISSION,
            self.rel_path(),
            self.op_name(),
            None,
        )
    }

    /// The endpoint resource exposing this node's path segment.
    pub fn api_resource(&self) -> Result<Option<Rc<Resource>>, DeriveError> {
        if let Some(cached) = self.api_resource.get() {
            return Ok(Some(Rc::clone(cached)));
        }
        if !flag(&self.conf.api_resource_enabled) {
            return Ok(None);
        }
        self.api_resource_pre_check()?;
        let resource = Rc::new(self.build_api_resource()?);
        let _ = self.api_resource.set(Rc::clone(&resource));
        Ok(Some(resource))
    }

    /// Structural eligibility for an endpoint resource.
    pub fn api_resource_pre_check(&self) -> Result<(), DeriveError> {
        if self.op_name.is_some() {
            return Err(DeriveError::precondition(
                "endpoint resources attach to nodes, not operations",
            ));
        }
        if self.rel_path.is_empty() {
            return Err(DeriveError::precondition(
                "the root node has no path segment to expose",
            ));
        }
        if self.conf.rest_api.value().is_none() {
            return Err(DeriveError::precondition(
                "no enclosing API reference: rest_api is not set",
            ));
        }
        if self.conf.api_resource_path_part.value().is_none() {
            return Err(DeriveError::precondition(
                "api_resource_path_part is not set",
            ));
        }
        Ok(())
    }

    fn build_api_resource(&self) -> Result<Resource, DeriveError> {
        let api = self.rest_api_ref()?;
        let path_part = self.conf.api_resource_path_part.require("api_resource_path_part")?;

        let mut depends_on = Vec::new();
        if let Some(id) = api.logical_id() {
            depends_on.push(id.to_string());
        }
        let parent_id = match self.resource_parent()? {
            Some(parent_resource) => {
                depends_on.push(parent_resource.logical_id.clone());
                json!({ "Ref": parent_resource.logical_id })
            }
            None => api.root_resource_handle()?,
        };

        let props = json!({
            "ParentId": parent_id,
            "PathPart": path_part,
            "RestApiId": api.reference(),
        });
        Ok(Resource::new(
            self.api_resource_logic_id(),
            ResourceKind::ApiResource,
            depends_on,
            props,
        ))
    }

    /// Nearest ancestor node that exposes an endpoint resource of its
    /// own; a top-level endpoint hangs off the API root instead.
    fn resource_parent(&self) -> Result<Option<Rc<Resource>>, DeriveError> {
        let mut current = self.parent.as_ref();
        while let Some(node) = current {
            if node.op_name.is_none()
                && !node.rel_path.is_empty()
                && flag(&node.conf.api_resource_enabled)
            {
                return node.api_resource();
            }
            current = node.parent.as_ref();
        }
        Ok(None)
    }

    /// The endpoint method routing this operation's wire method to its
    /// backing function.
    pub fn api_method(&self) -> Result<Option<Rc<Resource>>, DeriveError> {
        if let Some(cached) = self.api_method.get() {
            return Ok(Some(Rc::clone(cached)));
        }
        if !flag(&self.conf.api_method_enabled) {
            return Ok(None);
        }
        self.api_method_pre_check()?;
        let method = Rc::new(self.build_api_method()?);
        let _ = self.api_method.set(Rc::clone(&method));
        Ok(Some(method))
    }

    /// Structural eligibility for an endpoint method.
    pub fn api_method_pre_check(&self) -> Result<(), DeriveError> {
        let Some(op) = self.op_name() else {
            return Err(DeriveError::precondition(
                "endpoint methods attach to operations, not bare nodes",
            ));
        };
        if http_method(op).is_none() {
            return Err(DeriveError::precondition(format!(
                "no wire method for operation {op}"
            )));
        }
        if self.conf.rest_api.value().is_none() {
            return Err(DeriveError::precondition(
                "no enclosing API reference: rest_api is not set",
            ));
        }
        if self.owning_node().is_none() {
            return Err(DeriveError::precondition(
                "operation has no owning node",
            ));
        }
        Ok(())
    }

    /// The owning node's endpoint resource, which methods hang off.
    fn enclosing_resource(&self) -> Result<Rc<Resource>, DeriveError> {
        let node = self.owning_node().ok_or_else(|| {
            DeriveError::precondition("operation has no owning node")
        })?;
        node.api_resource()?.ok_or_else(|| {
            DeriveError::precondition("owning node does not expose an endpoint resource")
        })
    }

    fn build_api_method(&self) -> Result<Resource, DeriveError> {
        let op = self.op_name().ok_or_else(|| {
            DeriveError::precondition("endpoint methods attach to operations, not bare nodes")
        })?;
        let api = self.rest_api_ref()?;
        let resource = self.enclosing_resource()?;
        let function = self.backing_function()?;
        let integration = IntegrationType::parse(
            self.conf
                .api_integration_type
                .value()
                .map(String::as_str)
                .unwrap_or(IntegrationType::Rest.as_str()),
        )?;
        let auth = AuthorizationType::parse(
            self.conf
                .api_authorization_type
                .value()
                .map(String::as_str)
                .unwrap_or(AuthorizationType::None.as_str()),
        )?;
        let method = http_method(op).ok_or_else(|| {
            DeriveError::precondition(format!("no wire method for operation {op}"))
        })?;

        let mut props = Map::new();
        props.insert("HttpMethod".to_string(), json!(method));
        props.insert("ResourceId".to_string(), json!({ "Ref": resource.logical_id }));
        props.insert("RestApiId".to_string(), api.reference());
        props.insert("AuthorizationType".to_string(), json!(auth.as_str()));
        if auth.uses_authorizer_id() {
            let authorizer = self.conf.api_authorizer.require("api_authorizer")?;
            props.insert("AuthorizerId".to_string(), authorizer.authorizer_id()?);
        }
        props.insert(
            "Integration".to_string(),
            integration_value(integration, &function),
        );

        let depends_on = vec![resource.logical_id.clone(), function.logical_id.clone()];
        Ok(Resource::new(
            self.api_method_logic_id(),
            ResourceKind::ApiMethod,
            depends_on,
            Value::Object(props),
        ))
    }

    /// The invoke grant letting the API front door call the backing
    /// function.
    pub fn method_permission(&self) -> Result<Option<Rc<Resource>>, DeriveError> {
        if let Some(cached) = self.method_permission.get() {
            return Ok(Some(Rc::clone(cached)));
        }
        if !flag(&self.conf.api_method_enabled) {
            return Ok(None);
        }
        self.method_permission_pre_check()?;
        let permission = Rc::new(self.build_method_permission()?);
        let _ = self.method_permission.set(Rc::clone(&permission));
        Ok(Some(permission))
    }

    pub fn method_permission_pre_check(&self) -> Result<(), DeriveError> {
        self.api_method_pre_check()
    }

    fn build_method_permission(&self) -> Result<Resource, DeriveError> {
        let method = self.api_method()?.ok_or_else(|| {
            DeriveError::precondition("endpoint method is not enabled")
        })?;
        let function = self.backing_function()?;
        let api = self.rest_api_ref()?;

        let source_arn = json!({
            "Fn::Sub": [
                "arn:aws:execute-api:${AWS::Region}:${AWS::AccountId}:${ApiId}/*/*",
                { "ApiId": api.reference() },
            ]
        });
        let props = json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": { "Fn::GetAtt": [function.logical_id, "Arn"] },
            "Principal": "apigateway.amazonaws.com",
            "SourceArn": source_arn,
        });
        let depends_on = vec![method.logical_id.clone(), function.logical_id.clone()];
        Ok(Resource::new(
            self.method_permission_logic_id(),
            ResourceKind::Permission,
            depends_on,
            props,
        ))
    }

    /// The preflight method answering `OPTIONS` on this endpoint path.
    ///
    /// Every cors-enabled operation on a node derives the same logical
    /// id, so the template keeps exactly one.
    pub fn cors_method(&self) -> Result<Option<Rc<Resource>>, DeriveError> {
        if let Some(cached) = self.cors_method.get() {
            return Ok(Some(Rc::clone(cached)));
        }
        if !flag(&self.conf.api_method_enabled) || !flag(&self.conf.cors_enabled) {
            return Ok(None);
        }
        self.cors_method_pre_check()?;
        let method = Rc::new(self.build_cors_method()?);
        let _ = self.cors_method.set(Rc::clone(&method));
        Ok(Some(method))
    }

    pub fn cors_method_pre_check(&self) -> Result<(), DeriveError> {
        self.api_method_pre_check()
    }

    fn build_cors_method(&self) -> Result<Resource, DeriveError> {
        let op = self.op_name().ok_or_else(|| {
            DeriveError::precondition("endpoint methods attach to operations, not bare nodes")
        })?;
        let api = self.rest_api_ref()?;
        let resource = self.enclosing_resource()?;
        let auth = AuthorizationType::parse(
            self.conf
                .api_authorization_type
                .value()
                .map(String::as_str)
                .unwrap_or(AuthorizationType::None.as_str()),
        )?;

        let mut headers: Vec<String> = self
            .conf
            .cors_allow_headers
            .value()
            .cloned()
            .unwrap_or_else(|| {
                crate::config::BASE_CORS_ALLOW_HEADERS
                    .iter()
                    .map(|h| h.to_string())
                    .collect()
            });
        // The browser must be allowed to send the identity header on
        // any endpoint an authorizer protects.
        if auth.uses_authorizer_id() {
            if let Some(header) = self.conf.identity_header.value() {
                headers.push(header.clone());
            }
        }
        let allow_headers = dedup_headers(headers).join(",");
        let allow_origin = self
            .conf
            .cors_allow_origin
            .value()
            .map(String::as_str)
            .unwrap_or(crate::config::DEFAULT_CORS_ALLOW_ORIGIN);
        let wire_method = http_method(op).ok_or_else(|| {
            DeriveError::precondition(format!("no wire method for operation {op}"))
        })?;
        let allow_methods = format!("{wire_method},OPTIONS");

        let response_params = json!({
            "method.response.header.Access-Control-Allow-Headers": format!("'{allow_headers}'"),
            "method.response.header.Access-Control-Allow-Methods": format!("'{allow_methods}'"),
            "method.response.header.Access-Control-Allow-Origin": format!("'{allow_origin}'"),
        });
        let props = json!({
            "HttpMethod": "OPTIONS",
            "AuthorizationType": "NONE",
            "ResourceId": { "Ref": resource.logical_id },
            "RestApiId": api.reference(),
            "Integration": {
                "Type": "MOCK",
                "RequestTemplates": { "application/json": "{\"statusCode\": 200}" },
                "IntegrationResponses": [{
                    "StatusCode": "200",
                    "ResponseParameters": response_params,
                }],
            },
            "MethodResponses": [{
                "StatusCode": "200",
                "ResponseParameters": {
                    "method.response.header.Access-Control-Allow-Headers": true,
                    "method.response.header.Access-Control-Allow-Methods": true,
                    "method.response.header.Access-Control-Allow-Origin": true,
                },
            }],
        });
        let depends_on = vec![resource.logical_id.clone()];
        Ok(Resource::new(
            self.cors_method_logic_id(),
            ResourceKind::CorsOptionsMethod,
            depends_on,
            props,
        ))
    }

    /// The token authorizer backed by this operation's function.
    pub fn authorizer(&self) -> Result<Option<Rc<Resource>>, DeriveError> {
        if let Some(cached) = self.authorizer.get() {
            return Ok(Some(Rc::clone(cached)));
        }
        if !flag(&self.conf.authorizer_enabled) {
            return Ok(None);
        }
        self.authorizer_pre_check()?;
        let authorizer = Rc::new(self.build_authorizer()?);
        let _ = self.authorizer.set(Rc::clone(&authorizer));
        Ok(Some(authorizer))
    }

    /// Structural eligibility for a token authorizer.
    pub fn authorizer_pre_check(&self) -> Result<(), DeriveError> {
        if self.op_name.is_none() {
            return Err(DeriveError::precondition(
                "a token authorizer requires a backing operation",
            ));
        }
        if self.conf.rest_api.value().is_none() {
            return Err(DeriveError::precondition(
                "no enclosing API reference: rest_api is not set",
            ));
        }
        Ok(())
    }

    fn build_authorizer(&self) -> Result<Resource, DeriveError> {
        let api = self.rest_api_ref()?;
        let function = self.backing_function()?;
        let name = self.conf.authorizer_name.require("authorizer_name")?;
        let header = self.conf.identity_header.require("identity_header")?;

        let mut depends_on = Vec::new();
        if let Some(id) = api.logical_id() {
            depends_on.push(id.to_string());
        }
        depends_on.push(function.logical_id.clone());

        let props = json!({
            "Name": name,
            "RestApiId": api.reference(),
            "Type": "TOKEN",
            "AuthType": "custom",
            "AuthorizerResultTtlInSeconds": 300,
            "AuthorizerUri": invoke_uri(&function),
            "IdentitySource": format!("method.request.header.{header}"),
        });
        Ok(Resource::new(
            self.authorizer_logic_id(),
            ResourceKind::ApiAuthorizer,
            depends_on,
            props,
        ))
    }
}

/// Drop repeated header names; first occurrence wins, comparison
/// ignores ASCII case.
fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        if !out.iter().any(|kept| kept.eq_ignore_ascii_case(&header)) {
            out.push(header);
        }
    }
    out
}

fn integration_value(integration: IntegrationType, function: &Resource) -> Value {
    let uri = invoke_uri(function);
    match integration {
        IntegrationType::Rest => json!({
            "Type": "AWS_PROXY",
            "IntegrationHttpMethod": "POST",
            "Uri": uri,
        }),
        IntegrationType::Rpc => json!({
            "Type": "AWS",
            "IntegrationHttpMethod": "POST",
            "Uri": uri,
        }),
        IntegrationType::Passthrough => json!({
            "Type": "AWS",
            "IntegrationHttpMethod": "POST",
            "PassthroughBehavior": "WHEN_NO_MATCH",
            "Uri": uri,
        }),
    }
}
