//! Lazy, memoized resource derivation
//!
//! `ResourceConfig` pairs one resolved config with its tree context and
//! exposes one accessor per resource kind. Every accessor follows the
//! same shape: a disabled kind returns whatever is cached (typically
//! nothing) without building; otherwise the structural pre-check runs,
//! the descriptor is built from current field values, and the result is
//! cached once. Cross-references go through the same accessors, so the
//! dependency graph emerges on demand instead of from static analysis,
//! and every later access returns the identical `Rc`.

mod apigw;
mod sched;

use serde_json::{json, Map, Value};
use std::cell::OnceCell;
use std::rc::Rc;

use crate::config::FuncConfig;
use crate::error::DeriveError;
use crate::field::Field;
use crate::naming::{logical_id, prefix};
use crate::reference::ResourceRef;
use crate::resource::{Resource, ResourceKind};

/// True only for an explicit `Set(true)`; a pending flag is disabled.
pub(crate) fn flag(field: &Field<bool>) -> bool {
    matches!(field.value(), Some(true))
}

/// Invocation URI for an in-template function, as the API integration
/// and authorizer positions expect it.
pub(crate) fn invoke_uri(function: &Resource) -> Value {
    json!({
        "Fn::Sub": format!(
            "arn:aws:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{}.Arn}}/invocations",
            function.logical_id
        )
    })
}

/// A resolved config bound to its place in the tree, with one lazy-once
/// cell per derivable resource kind.
#[derive(Debug)]
pub struct ResourceConfig {
    conf: FuncConfig,
    rel_path: Vec<String>,
    op_name: Option<String>,
    parent: Option<Rc<ResourceConfig>>,

    function: OnceCell<Rc<Resource>>,
    api_resource: OnceCell<Rc<Resource>>,
    api_method: OnceCell<Rc<Resource>>,
    method_permission: OnceCell<Rc<Resource>>,
    cors_method: OnceCell<Rc<Resource>>,
    authorizer: OnceCell<Rc<Resource>>,
    schedule_rules: OnceCell<Vec<Rc<Resource>>>,
    schedule_permissions: OnceCell<Vec<Rc<Resource>>>,
}

impl ResourceConfig {
    /// Bind a resolved config to its tree context. Operation configs
    /// point at their owning node, node configs at the parent node.
    pub fn new(
        conf: FuncConfig,
        rel_path: Vec<String>,
        op_name: Option<String>,
        parent: Option<Rc<ResourceConfig>>,
    ) -> Self {
        Self {
            conf,
            rel_path,
            op_name,
            parent,
            function: OnceCell::new(),
            api_resource: OnceCell::new(),
            api_method: OnceCell::new(),
            method_permission: OnceCell::new(),
            cors_method: OnceCell::new(),
            authorizer: OnceCell::new(),
            schedule_rules: OnceCell::new(),
            schedule_permissions: OnceCell::new(),
        }
    }

    pub fn conf(&self) -> &FuncConfig {
        &self.conf
    }

    pub fn rel_path(&self) -> &[String] {
        &self.rel_path
    }

    pub fn op_name(&self) -> Option<&str> {
        self.op_name.as_deref()
    }

    pub fn parent(&self) -> Option<&Rc<ResourceConfig>> {
        self.parent.as_ref()
    }

    /// The owning node of an operation config; `None` for node configs.
    pub(crate) fn owning_node(&self) -> Option<&Rc<ResourceConfig>> {
        if self.op_name.is_some() {
            self.parent.as_ref()
        } else {
            None
        }
    }

    /// The enclosing API reference, required by every API-side kind.
    pub(crate) fn rest_api_ref(&self) -> Result<&ResourceRef, DeriveError> {
        self.conf
            .rest_api
            .value()
            .ok_or_else(|| DeriveError::precondition("no enclosing API reference: rest_api is not set"))
    }

    pub fn function_logic_id(&self) -> String {
        logical_id(prefix::FUNCTION, &self.rel_path, self.op_name(), None)
    }

    /// The function descriptor backing this operation.
    ///
    /// There is no explicit enable flag: being bound to a leaf operation
    /// is what makes a config function-bearing. Node-level configs
    /// return nothing.
    pub fn function(&self) -> Result<Option<Rc<Resource>>, DeriveError> {
        if let Some(cached) = self.function.get() {
            return Ok(Some(Rc::clone(cached)));
        }
        if self.op_name.is_none() {
            return Ok(None);
        }
        self.function_pre_check()?;
        let function = Rc::new(self.build_function()?);
        let _ = self.function.set(Rc::clone(&function));
        Ok(Some(function))
    }

    /// Structural eligibility for a function descriptor.
    pub fn function_pre_check(&self) -> Result<(), DeriveError> {
        if self.op_name.is_none() {
            return Err(DeriveError::precondition(
                "a function descriptor requires a bound operation, not a bare node",
            ));
        }
        Ok(())
    }

    /// The backing function, for kinds that grant or route to it.
    pub(crate) fn backing_function(&self) -> Result<Rc<Resource>, DeriveError> {
        self.function()?.ok_or_else(|| {
            DeriveError::precondition("no backing function: config is not bound to an operation")
        })
    }

    fn build_function(&self) -> Result<Resource, DeriveError> {
        let conf = &self.conf;
        let function_name = conf.function_name.require("function_name")?;
        let runtime = conf.runtime.require("runtime")?;
        let code = conf.code.require("code")?;
        let role = conf.iam_role.require("iam_role")?.role_arn()?;

        let mut props = Map::new();
        props.insert("FunctionName".to_string(), json!(function_name));
        props.insert("Handler".to_string(), json!(self.handler_path()));
        props.insert("Runtime".to_string(), json!(runtime));
        props.insert(
            "Code".to_string(),
            json!({ "S3Bucket": code.s3_bucket, "S3Key": code.s3_key }),
        );
        props.insert("Role".to_string(), role);

        if let Some(description) = conf.description.value() {
            props.insert("Description".to_string(), json!(description));
        }
        if let Some(memory) = conf.memory_size.value() {
            props.insert("MemorySize".to_string(), json!(memory));
        }
        if let Some(timeout) = conf.timeout.value() {
            props.insert("Timeout".to_string(), json!(timeout));
        }
        if let Some(layers) = conf.layers.value() {
            props.insert("Layers".to_string(), json!(layers));
        }
        if let Some(limit) = conf.reserved_concurrency.value() {
            props.insert("ReservedConcurrentExecutions".to_string(), json!(limit));
        }
        if let Some(vars) = conf.environment_vars.value() {
            props.insert("Environment".to_string(), json!({ "Variables": vars }));
        }
        if let Some(arn) = conf.kms_key_arn.value() {
            props.insert("KmsKeyArn".to_string(), json!(arn));
        }
        if let Some(vpc) = conf.vpc_config.value() {
            props.insert(
                "VpcConfig".to_string(),
                json!({
                    "SecurityGroupIds": vpc.security_group_ids,
                    "SubnetIds": vpc.subnet_ids,
                }),
            );
        }
        if let Some(arn) = conf.dead_letter_target_arn.value() {
            props.insert(
                "DeadLetterConfig".to_string(),
                json!({ "TargetArn": arn }),
            );
        }
        if let Some(mode) = conf.tracing_mode.value() {
            props.insert("TracingConfig".to_string(), json!({ "Mode": mode }));
        }

        Ok(Resource::new(
            self.function_logic_id(),
            ResourceKind::Function,
            vec![],
            Value::Object(props),
        ))
    }

    /// Source path of the callable: the relative module path plus the
    /// operation name, dot-joined.
    fn handler_path(&self) -> String {
        let mut parts: Vec<&str> = self.rel_path.iter().map(String::as_str).collect();
        if let Some(op) = self.op_name() {
            parts.push(op);
        }
        parts.join(".")
    }
}
