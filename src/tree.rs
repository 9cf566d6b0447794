//! Input contract from the tree-discovery collaborator
//!
//! Discovery walks the source hierarchy and hands the resolver an
//! ordered, rooted tree: one `HandlerNode` per source unit, each with an
//! optional module-level config and zero or more named leaf operations.
//! The tree is data, not reflection: nothing here looks anything up
//! dynamically.

use crate::config::FuncConfig;

/// Operation name whose derived function identifier elides the op
/// suffix.
pub const DEFAULT_HANDLER_OP: &str = "handler";

/// Closed set of leaf-operation names eligible for configuration: the
/// default handler plus the HTTP verb set (`any` is the catch-all).
pub const VALID_OP_NAMES: &[&str] = &[
    "handler", "get", "post", "put", "patch", "delete", "head", "options", "any",
];

/// Wire method for an operation name.
///
/// HTTP-verb ops map to their uppercase method, `any` to the catch-all,
/// and the default handler op to `POST` (the rpc-style convention).
pub fn http_method(op_name: &str) -> Option<&'static str> {
    match op_name {
        "get" => Some("GET"),
        "post" => Some("POST"),
        "put" => Some("PUT"),
        "patch" => Some("PATCH"),
        "delete" => Some("DELETE"),
        "head" => Some("HEAD"),
        "options" => Some("OPTIONS"),
        "any" => Some("ANY"),
        DEFAULT_HANDLER_OP => Some("POST"),
        _ => None,
    }
}

/// A named leaf operation attached to a node.
#[derive(Debug, Clone, Default)]
pub struct HandlerOp {
    pub name: String,
    pub config: Option<FuncConfig>,
}

impl HandlerOp {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
        }
    }

    pub fn with_config(mut self, config: FuncConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// One point in the source hierarchy: an optional module-level config,
/// ordered leaf operations, and ordered children.
#[derive(Debug, Clone, Default)]
pub struct HandlerNode {
    pub name: String,
    pub config: Option<FuncConfig>,
    pub ops: Vec<HandlerOp>,
    pub children: Vec<HandlerNode>,
}

impl HandlerNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
            ops: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: FuncConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_op(mut self, op: HandlerOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn with_child(mut self, child: HandlerNode) -> Self {
        self.children.push(child);
        self
    }
}
