//! Polymorphic references to platform resources
//!
//! The role, API-root, and authorizer fields accept several reference
//! shapes. Each consumer normalizes the shape it received into the
//! single reference form the output format expects; shapes a position
//! cannot express are rejected as `UnsupportedReferenceVariant`, never
//! guessed at.

use serde_json::{json, Value};
use std::rc::Rc;

use crate::error::DeriveError;
use crate::resource::{Resource, ResourceKind};

/// A reference to a platform resource, in one of the accepted shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRef {
    /// Same-template symbolic reference by logical id.
    Ref(String),
    /// Attribute of a same-template resource.
    GetAtt(String, String),
    /// Cross-stack import by export name.
    Import(String),
    /// Stack parameter by name.
    Parameter(String),
    /// Raw identifier string, passed through untouched.
    Raw(String),
    /// A descriptor constructed in this template.
    Descriptor(Rc<Resource>),
}

impl ResourceRef {
    /// Logical id within this template, when the shape names one.
    ///
    /// Used to author `DependsOn` lists; external shapes (imports,
    /// parameters, raw identifiers) have no in-template id.
    pub fn logical_id(&self) -> Option<&str> {
        match self {
            ResourceRef::Ref(id) | ResourceRef::GetAtt(id, _) => Some(id),
            ResourceRef::Descriptor(resource) => Some(&resource.logical_id),
            ResourceRef::Import(_) | ResourceRef::Parameter(_) | ResourceRef::Raw(_) => None,
        }
    }

    /// The single reference form the output format expects.
    pub fn reference(&self) -> Value {
        match self {
            ResourceRef::Ref(id) => json!({ "Ref": id }),
            ResourceRef::GetAtt(id, attr) => json!({ "Fn::GetAtt": [id, attr] }),
            ResourceRef::Import(name) => json!({ "Fn::ImportValue": name }),
            ResourceRef::Parameter(name) => json!({ "Ref": name }),
            ResourceRef::Raw(text) => json!(text),
            ResourceRef::Descriptor(resource) => json!({ "Ref": resource.logical_id }),
        }
    }

    /// Normalized execution-role ARN for a function descriptor.
    ///
    /// A symbolic reference to an in-template role resolves to its `Arn`
    /// attribute; parameters and imports are assumed to carry the ARN
    /// already. No role descriptor kind exists in this template's
    /// vocabulary, so a constructed descriptor is not a valid shape here.
    pub fn role_arn(&self) -> Result<Value, DeriveError> {
        match self {
            ResourceRef::Ref(id) => Ok(json!({ "Fn::GetAtt": [id, "Arn"] })),
            ResourceRef::GetAtt(id, attr) => Ok(json!({ "Fn::GetAtt": [id, attr] })),
            ResourceRef::Import(name) => Ok(json!({ "Fn::ImportValue": name })),
            ResourceRef::Parameter(name) => Ok(json!({ "Ref": name })),
            ResourceRef::Raw(arn) => Ok(json!(arn)),
            ResourceRef::Descriptor(resource) => {
                Err(DeriveError::UnsupportedReferenceVariant {
                    context: format!(
                        "execution role cannot be the constructed descriptor {}",
                        resource.logical_id
                    ),
                })
            }
        }
    }

    /// Normalized authorizer id reference for an endpoint method.
    ///
    /// A constructed descriptor must actually be an authorizer.
    pub fn authorizer_id(&self) -> Result<Value, DeriveError> {
        if let ResourceRef::Descriptor(resource) = self {
            if resource.kind != ResourceKind::ApiAuthorizer {
                return Err(DeriveError::UnsupportedReferenceVariant {
                    context: format!(
                        "authorizer reference points at {} which is {:?}, not an authorizer",
                        resource.logical_id, resource.kind
                    ),
                });
            }
        }
        Ok(self.reference())
    }

    /// Handle to the API's synthetic root resource.
    ///
    /// Only same-template shapes can reach the root resource attribute;
    /// a parameter, import, or raw identifier cannot.
    pub fn root_resource_handle(&self) -> Result<Value, DeriveError> {
        match self {
            ResourceRef::Ref(id) | ResourceRef::GetAtt(id, _) => {
                Ok(json!({ "Fn::GetAtt": [id, "RootResourceId"] }))
            }
            ResourceRef::Descriptor(resource) => {
                Ok(json!({ "Fn::GetAtt": [resource.logical_id, "RootResourceId"] }))
            }
            other => Err(DeriveError::UnsupportedReferenceVariant {
                context: format!(
                    "API root handle requires a same-template reference, got {other:?}"
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_authorizer() -> Rc<Resource> {
        Rc::new(Resource::new(
            "ApiAuthorizerAuthHandler",
            ResourceKind::ApiAuthorizer,
            vec![],
            json!({}),
        ))
    }

    #[test]
    fn test_reference_forms() {
        assert_eq!(
            ResourceRef::Ref("RestApi".to_string()).reference(),
            json!({ "Ref": "RestApi" })
        );
        assert_eq!(
            ResourceRef::Parameter("ApiAuthorizerId".to_string()).reference(),
            json!({ "Ref": "ApiAuthorizerId" })
        );
        assert_eq!(
            ResourceRef::Import("authorizer-id-export".to_string()).reference(),
            json!({ "Fn::ImportValue": "authorizer-id-export" })
        );
        assert_eq!(
            ResourceRef::GetAtt("NestedStack".to_string(), "AuthorizerId".to_string()).reference(),
            json!({ "Fn::GetAtt": ["NestedStack", "AuthorizerId"] })
        );
        assert_eq!(
            ResourceRef::Raw("abc123".to_string()).reference(),
            json!("abc123")
        );
        assert_eq!(
            ResourceRef::Descriptor(make_test_authorizer()).reference(),
            json!({ "Ref": "ApiAuthorizerAuthHandler" })
        );
    }

    #[test]
    fn test_authorizer_id_accepts_authorizer_descriptor() {
        let reference = ResourceRef::Descriptor(make_test_authorizer());
        assert_eq!(
            reference.authorizer_id().unwrap(),
            json!({ "Ref": "ApiAuthorizerAuthHandler" })
        );
    }

    #[test]
    fn test_authorizer_id_rejects_wrong_kind() {
        let function = Rc::new(Resource::new(
            "FuncAuthHandler",
            ResourceKind::Function,
            vec![],
            json!({}),
        ));
        let err = ResourceRef::Descriptor(function).authorizer_id().unwrap_err();
        assert!(matches!(
            err,
            DeriveError::UnsupportedReferenceVariant { .. }
        ));
    }

    #[test]
    fn test_role_arn_normalization() {
        assert_eq!(
            ResourceRef::Ref("FuncRole".to_string()).role_arn().unwrap(),
            json!({ "Fn::GetAtt": ["FuncRole", "Arn"] })
        );
        assert_eq!(
            ResourceRef::Raw("arn:aws:iam::123:role/app".to_string())
                .role_arn()
                .unwrap(),
            json!("arn:aws:iam::123:role/app")
        );
        let err = ResourceRef::Descriptor(make_test_authorizer())
            .role_arn()
            .unwrap_err();
        assert!(matches!(
            err,
            DeriveError::UnsupportedReferenceVariant { .. }
        ));
    }

    #[test]
    fn test_root_resource_handle() {
        assert_eq!(
            ResourceRef::Ref("RestApi".to_string())
                .root_resource_handle()
                .unwrap(),
            json!({ "Fn::GetAtt": ["RestApi", "RootResourceId"] })
        );
        let err = ResourceRef::Parameter("ApiId".to_string())
            .root_resource_handle()
            .unwrap_err();
        assert!(matches!(
            err,
            DeriveError::UnsupportedReferenceVariant { .. }
        ));
    }

    #[test]
    fn test_logical_id_only_for_in_template_shapes() {
        assert_eq!(
            ResourceRef::Ref("RestApi".to_string()).logical_id(),
            Some("RestApi")
        );
        assert_eq!(
            ResourceRef::Import("export".to_string()).logical_id(),
            None
        );
        assert_eq!(ResourceRef::Raw("id".to_string()).logical_id(), None);
    }
}
