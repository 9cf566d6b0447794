//! Resource descriptors and the deduplicating output template
//!
//! A `Resource` is one infrastructure object destined for the emitted
//! template: a deterministic logical id, a kind tag, an authored list of
//! the logical ids it depends on, and kind-specific properties. The
//! `Template` collects descriptors in insertion order and silently
//! ignores duplicate logical ids.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Closed set of resource kinds this engine synthesizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Function,
    ApiResource,
    ApiMethod,
    CorsOptionsMethod,
    ApiAuthorizer,
    ScheduledRule,
    Permission,
}

impl ResourceKind {
    /// Platform type string the emission layer serializes under `Type`.
    pub fn type_name(self) -> &'static str {
        match self {
            ResourceKind::Function => "AWS::Lambda::Function",
            ResourceKind::ApiResource => "AWS::ApiGateway::Resource",
            ResourceKind::ApiMethod | ResourceKind::CorsOptionsMethod => {
                "AWS::ApiGateway::Method"
            }
            ResourceKind::ApiAuthorizer => "AWS::ApiGateway::Authorizer",
            ResourceKind::ScheduledRule => "AWS::Events::Rule",
            ResourceKind::Permission => "AWS::Lambda::Permission",
        }
    }
}

/// One synthesized resource descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Deterministic, unique-within-template name.
    pub logical_id: String,

    /// Kind tag; maps to the platform type string.
    pub kind: ResourceKind,

    /// Logical ids of the descriptors this one must be provisioned
    /// after. Authored per kind, never inferred from property contents.
    pub depends_on: Vec<String>,

    /// Kind-specific key/value properties.
    pub properties: Value,
}

impl Resource {
    pub fn new(
        logical_id: impl Into<String>,
        kind: ResourceKind,
        depends_on: Vec<String>,
        properties: Value,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            kind,
            depends_on,
            properties,
        }
    }

    /// Render in the emission layer's shape: `Type`, `DependsOn` (omitted
    /// when empty), `Properties`.
    pub fn to_value(&self) -> Value {
        let mut body = Map::new();
        body.insert("Type".to_string(), Value::from(self.kind.type_name()));
        if !self.depends_on.is_empty() {
            body.insert(
                "DependsOn".to_string(),
                Value::from(self.depends_on.clone()),
            );
        }
        body.insert("Properties".to_string(), self.properties.clone());
        Value::Object(body)
    }
}

/// Ordered, unique-by-logical-id collection of descriptors.
///
/// Duplicate insertion is a deliberate no-op: the first writer wins and
/// the second insert is silently dropped. Colliding ids are not checked
/// for equivalence.
#[derive(Debug, Default)]
pub struct Template {
    resources: Vec<Rc<Resource>>,
    index: HashMap<String, usize>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor; returns false (and leaves the existing entry
    /// untouched) when the logical id is already present.
    pub fn insert(&mut self, resource: Rc<Resource>) -> bool {
        if self.index.contains_key(&resource.logical_id) {
            return false;
        }
        self.index
            .insert(resource.logical_id.clone(), self.resources.len());
        self.resources.push(resource);
        true
    }

    pub fn get(&self, logical_id: &str) -> Option<&Rc<Resource>> {
        self.index
            .get(logical_id)
            .map(|&slot| &self.resources[slot])
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.index.contains_key(logical_id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Descriptors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Resource>> {
        self.resources.iter()
    }

    /// Render the whole template for the emission collaborator.
    pub fn to_value(&self) -> Value {
        let mut resources = Map::new();
        for resource in &self.resources {
            resources.insert(resource.logical_id.clone(), resource.to_value());
        }
        let mut root = Map::new();
        root.insert("Resources".to_string(), Value::Object(resources));
        Value::Object(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_test_resource(logical_id: &str, memory: u32) -> Rc<Resource> {
        Rc::new(Resource::new(
            logical_id,
            ResourceKind::Function,
            vec![],
            json!({ "MemorySize": memory }),
        ))
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut template = Template::new();
        template.insert(make_test_resource("FuncB", 128));
        template.insert(make_test_resource("FuncA", 128));

        let ids: Vec<&str> = template.iter().map(|r| r.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["FuncB", "FuncA"]);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut template = Template::new();
        assert!(template.insert(make_test_resource("FuncA", 128)));
        assert!(!template.insert(make_test_resource("FuncA", 1024)));

        assert_eq!(template.len(), 1);
        // First writer wins.
        let kept = template.get("FuncA").unwrap();
        assert_eq!(kept.properties["MemorySize"], 128);
    }

    #[test]
    fn test_to_value_shape() {
        let mut template = Template::new();
        template.insert(Rc::new(Resource::new(
            "ApiResourceRest",
            ResourceKind::ApiResource,
            vec!["RestApi".to_string()],
            json!({ "PathPart": "rest" }),
        )));

        let value = template.to_value();
        let body = &value["Resources"]["ApiResourceRest"];
        assert_eq!(body["Type"], "AWS::ApiGateway::Resource");
        assert_eq!(body["DependsOn"], json!(["RestApi"]));
        assert_eq!(body["Properties"]["PathPart"], "rest");
    }

    #[test]
    fn test_empty_depends_on_is_omitted() {
        let resource = Resource::new(
            "FuncA",
            ResourceKind::Function,
            vec![],
            json!({}),
        );
        let value = resource.to_value();
        assert!(value.get("DependsOn").is_none());
    }

    #[test]
    fn test_method_kinds_share_type_name() {
        assert_eq!(
            ResourceKind::ApiMethod.type_name(),
            ResourceKind::CorsOptionsMethod.type_name()
        );
    }
}
