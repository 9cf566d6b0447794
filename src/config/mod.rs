//! Handler configuration schema
//!
//! `FuncConfig` is the fixed field schema shared by every node and every
//! (node, operation) pair. Required fields start as `Field::Required`,
//! optional ones as `Field::Unset`; resolution absorbs concrete values
//! down the parent chain and a separate pass fills static defaults.

pub mod resolve;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DeriveError;
use crate::field::Field;
use crate::reference::ResourceRef;

/// Static default for `memory_size` (megabytes).
pub const DEFAULT_MEMORY_SIZE: u32 = 128;

/// Static default for `timeout` (seconds).
pub const DEFAULT_TIMEOUT: u32 = 3;

/// Static default for the authorizer token header field.
pub const DEFAULT_IDENTITY_HEADER: &str = "auth";

/// Static default for the CORS allow-origin header.
pub const DEFAULT_CORS_ALLOW_ORIGIN: &str = "*";

/// Base CORS allow-header list; the authorizer's identity header is
/// appended when the method is protected by a token authorizer.
pub const BASE_CORS_ALLOW_HEADERS: &[&str] = &[
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
];

/// Backing artifact reference for a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCode {
    pub s3_bucket: String,
    pub s3_key: String,
}

impl FunctionCode {
    pub fn new(s3_bucket: impl Into<String>, s3_key: impl Into<String>) -> Self {
        Self {
            s3_bucket: s3_bucket.into(),
            s3_key: s3_key.into(),
        }
    }
}

/// Network placement for a function.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VpcConfig {
    pub security_group_ids: Vec<String>,
    pub subnet_ids: Vec<String>,
}

/// Integration style of an endpoint method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationType {
    /// Proxy the request through to the backing function.
    Rest,
    /// Synchronous invoke with the platform's default mappings.
    Rpc,
    /// Invoke with passthrough of unmapped content types.
    Passthrough,
}

impl IntegrationType {
    pub const ALLOWED: &'static str = "rest, rpc, passthrough";

    /// Parse the closed-set string form; anything else is a
    /// configuration-authoring mistake.
    pub fn parse(value: &str) -> Result<Self, DeriveError> {
        match value {
            "rest" => Ok(IntegrationType::Rest),
            "rpc" => Ok(IntegrationType::Rpc),
            "passthrough" => Ok(IntegrationType::Passthrough),
            _ => Err(DeriveError::InvalidEnumValue {
                field: "api_integration_type",
                value: value.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntegrationType::Rest => "rest",
            IntegrationType::Rpc => "rpc",
            IntegrationType::Passthrough => "passthrough",
        }
    }
}

/// Authorization mode of an endpoint method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationType {
    None,
    AwsIam,
    Custom,
    CognitoUserPools,
}

impl AuthorizationType {
    pub const ALLOWED: &'static str = "NONE, AWS_IAM, CUSTOM, COGNITO_USER_POOLS";

    pub fn parse(value: &str) -> Result<Self, DeriveError> {
        match value {
            "NONE" => Ok(AuthorizationType::None),
            "AWS_IAM" => Ok(AuthorizationType::AwsIam),
            "CUSTOM" => Ok(AuthorizationType::Custom),
            "COGNITO_USER_POOLS" => Ok(AuthorizationType::CognitoUserPools),
            _ => Err(DeriveError::InvalidEnumValue {
                field: "api_authorization_type",
                value: value.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthorizationType::None => "NONE",
            AuthorizationType::AwsIam => "AWS_IAM",
            AuthorizationType::Custom => "CUSTOM",
            AuthorizationType::CognitoUserPools => "COGNITO_USER_POOLS",
        }
    }

    /// True for any mode other than `NONE`.
    pub fn protects(self) -> bool {
        !matches!(self, AuthorizationType::None)
    }

    /// True for the modes that attach an authorizer id to the method.
    pub fn uses_authorizer_id(self) -> bool {
        matches!(
            self,
            AuthorizationType::Custom | AuthorizationType::CognitoUserPools
        )
    }
}

/// The configuration object: one per node, one per (node, op) pair.
///
/// Mutated only during resolution; resource derivation reads it through
/// `ResourceConfig` and never writes back.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncConfig {
    // Function identity and runtime settings.
    pub function_name: Field<String>,
    pub description: Field<String>,
    pub memory_size: Field<u32>,
    pub timeout: Field<u32>,
    pub runtime: Field<String>,
    pub code: Field<FunctionCode>,
    pub iam_role: Field<ResourceRef>,
    pub layers: Field<Vec<String>>,
    pub reserved_concurrency: Field<u32>,
    pub environment_vars: Field<BTreeMap<String, String>>,
    pub kms_key_arn: Field<String>,
    pub vpc_config: Field<VpcConfig>,
    pub dead_letter_target_arn: Field<String>,
    pub tracing_mode: Field<String>,

    // Endpoint resource.
    pub api_resource_enabled: Field<bool>,
    pub rest_api: Field<ResourceRef>,
    pub api_resource_path_part: Field<String>,

    // Endpoint method.
    pub api_method_enabled: Field<bool>,
    pub api_integration_type: Field<String>,
    pub api_authorization_type: Field<String>,
    pub api_authorizer: Field<ResourceRef>,

    // CORS.
    pub cors_enabled: Field<bool>,
    pub cors_allow_headers: Field<Vec<String>>,
    pub cors_allow_origin: Field<String>,

    // Token authorizer.
    pub authorizer_enabled: Field<bool>,
    pub authorizer_name: Field<String>,
    pub identity_header: Field<String>,

    // Scheduled trigger.
    pub schedule_enabled: Field<bool>,
    pub schedule_expressions: Field<Vec<String>>,
}

impl Default for FuncConfig {
    fn default() -> Self {
        Self {
            function_name: Field::Required,
            description: Field::Unset,
            memory_size: Field::Unset,
            timeout: Field::Unset,
            runtime: Field::Required,
            code: Field::Required,
            iam_role: Field::Required,
            layers: Field::Unset,
            reserved_concurrency: Field::Unset,
            environment_vars: Field::Unset,
            kms_key_arn: Field::Unset,
            vpc_config: Field::Unset,
            dead_letter_target_arn: Field::Unset,
            tracing_mode: Field::Unset,
            api_resource_enabled: Field::Unset,
            rest_api: Field::Unset,
            api_resource_path_part: Field::Unset,
            api_method_enabled: Field::Unset,
            api_integration_type: Field::Unset,
            api_authorization_type: Field::Unset,
            api_authorizer: Field::Unset,
            cors_enabled: Field::Unset,
            cors_allow_headers: Field::Unset,
            cors_allow_origin: Field::Unset,
            authorizer_enabled: Field::Unset,
            authorizer_name: Field::Unset,
            identity_header: Field::Unset,
            schedule_enabled: Field::Unset,
            schedule_expressions: Field::Unset,
        }
    }
}

impl FuncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy concrete values from `parent` into every still-pending slot.
    ///
    /// Never overwrites a concrete value, never raises, and is
    /// idempotent: absorbing an already-resolved config a second time
    /// changes nothing.
    pub fn absorb(&mut self, parent: &FuncConfig) {
        self.function_name.absorb(&parent.function_name);
        self.description.absorb(&parent.description);
        self.memory_size.absorb(&parent.memory_size);
        self.timeout.absorb(&parent.timeout);
        self.runtime.absorb(&parent.runtime);
        self.code.absorb(&parent.code);
        self.iam_role.absorb(&parent.iam_role);
        self.layers.absorb(&parent.layers);
        self.reserved_concurrency.absorb(&parent.reserved_concurrency);
        self.environment_vars.absorb(&parent.environment_vars);
        self.kms_key_arn.absorb(&parent.kms_key_arn);
        self.vpc_config.absorb(&parent.vpc_config);
        self.dead_letter_target_arn
            .absorb(&parent.dead_letter_target_arn);
        self.tracing_mode.absorb(&parent.tracing_mode);
        self.api_resource_enabled.absorb(&parent.api_resource_enabled);
        self.rest_api.absorb(&parent.rest_api);
        self.api_resource_path_part
            .absorb(&parent.api_resource_path_part);
        self.api_method_enabled.absorb(&parent.api_method_enabled);
        self.api_integration_type
            .absorb(&parent.api_integration_type);
        self.api_authorization_type
            .absorb(&parent.api_authorization_type);
        self.api_authorizer.absorb(&parent.api_authorizer);
        self.cors_enabled.absorb(&parent.cors_enabled);
        self.cors_allow_headers.absorb(&parent.cors_allow_headers);
        self.cors_allow_origin.absorb(&parent.cors_allow_origin);
        self.authorizer_enabled.absorb(&parent.authorizer_enabled);
        self.authorizer_name.absorb(&parent.authorizer_name);
        self.identity_header.absorb(&parent.identity_header);
        self.schedule_enabled.absorb(&parent.schedule_enabled);
        self.schedule_expressions
            .absorb(&parent.schedule_expressions);
    }

    /// Fill static schema defaults into fields still unset.
    ///
    /// `Required` fields are left pending; they surface as
    /// `MissingRequiredField` at resource-build time, not here.
    pub fn fill_defaults(&mut self) {
        self.memory_size.or_insert(DEFAULT_MEMORY_SIZE);
        self.timeout.or_insert(DEFAULT_TIMEOUT);
        self.api_resource_enabled.or_insert(false);
        self.api_method_enabled.or_insert(false);
        self.api_integration_type
            .or_insert(IntegrationType::Rest.as_str().to_string());
        self.api_authorization_type
            .or_insert(AuthorizationType::None.as_str().to_string());
        self.cors_enabled.or_insert(false);
        self.cors_allow_headers.or_insert(
            BASE_CORS_ALLOW_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        );
        self.cors_allow_origin
            .or_insert(DEFAULT_CORS_ALLOW_ORIGIN.to_string());
        self.authorizer_enabled.or_insert(false);
        self.identity_header
            .or_insert(DEFAULT_IDENTITY_HEADER.to_string());
        self.schedule_enabled.or_insert(false);
    }
}
