//! Pre-order inheritance resolution over the handler tree
//!
//! Three deterministic passes: an inherit pass absorbing concrete values
//! parent-to-child (and node-to-operation), a value pass filling derived
//! names and static schema defaults, and a bind pass wrapping each
//! resolved config with its tree context for lazy resource derivation.
//! Resolution never raises; unresolved `Required` fields are deferred to
//! resource-build time.

use std::rc::Rc;

use crate::config::FuncConfig;
use crate::derive::ResourceConfig;
use crate::naming::slugify;
use crate::tree::{HandlerNode, DEFAULT_HANDLER_OP, VALID_OP_NAMES};

/// Knobs for the resolver.
///
/// `valid_ops` may narrow the built-in registry (to reject verbs an
/// application never authors) but not widen it: names outside the
/// registry have no wire method and would never route.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub valid_ops: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            valid_ops: VALID_OP_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ResolveOptions {
    fn is_valid_op(&self, name: &str) -> bool {
        self.valid_ops.iter().any(|op| op == name)
    }
}

/// A node of the resolved tree, ready for resource derivation.
#[derive(Debug)]
pub struct ResolvedNode {
    pub name: String,
    pub config: Rc<ResourceConfig>,
    pub ops: Vec<Rc<ResourceConfig>>,
    pub children: Vec<ResolvedNode>,
}

/// Resolve the whole tree: inherit, fill values and defaults, bind.
pub fn resolve(root: HandlerNode, opts: &ResolveOptions) -> ResolvedNode {
    let seed = FuncConfig::new();
    let mut pending = inherit(root, &seed, opts);
    fill_values(&mut pending, &[]);
    bind(pending, None, Vec::new())
}

struct PendingNode {
    name: String,
    conf: FuncConfig,
    ops: Vec<(String, FuncConfig)>,
    children: Vec<PendingNode>,
}

/// Inherit pass: parent before children, node before its operations.
///
/// Sibling order cannot affect the outcome since absorption reads only
/// from the parent chain.
fn inherit(node: HandlerNode, parent: &FuncConfig, opts: &ResolveOptions) -> PendingNode {
    let mut conf = node.config.unwrap_or_default();
    conf.absorb(parent);

    let mut ops = Vec::new();
    for op in node.ops {
        if !opts.is_valid_op(&op.name) {
            continue;
        }
        let mut op_conf = op.config.unwrap_or_default();
        op_conf.absorb(&conf);
        ops.push((op.name, op_conf));
    }

    let children = node
        .children
        .into_iter()
        .map(|child| inherit(child, &conf, opts))
        .collect();

    PendingNode {
        name: node.name,
        conf,
        ops,
        children,
    }
}

/// Value pass: per-node derived names for still-pending fields, then
/// static schema defaults.
fn fill_values(node: &mut PendingNode, rel_path: &[String]) {
    if let Some(last) = rel_path.last() {
        node.conf.api_resource_path_part.or_insert(slugify(last));
    }

    for (op_name, op_conf) in &mut node.ops {
        if let Some(last) = rel_path.last() {
            op_conf.api_resource_path_part.or_insert(slugify(last));
        }
        let derived = derived_function_name(rel_path, op_name);
        op_conf.function_name.or_insert(derived.clone());
        op_conf.authorizer_name.or_insert(derived);
        op_conf.fill_defaults();
    }

    node.conf.fill_defaults();

    for child in &mut node.children {
        let mut child_path = rel_path.to_vec();
        child_path.push(child.name.clone());
        fill_values(child, &child_path);
    }
}

/// Bind pass: wrap configs with their tree context. Operation configs
/// point at their owning node, node configs at the parent node.
fn bind(
    node: PendingNode,
    parent: Option<&Rc<ResourceConfig>>,
    rel_path: Vec<String>,
) -> ResolvedNode {
    let config = Rc::new(ResourceConfig::new(
        node.conf,
        rel_path.clone(),
        None,
        parent.cloned(),
    ));

    let ops = node
        .ops
        .into_iter()
        .map(|(op_name, op_conf)| {
            Rc::new(ResourceConfig::new(
                op_conf,
                rel_path.clone(),
                Some(op_name),
                Some(Rc::clone(&config)),
            ))
        })
        .collect();

    let children = node
        .children
        .into_iter()
        .map(|child| {
            let mut child_path = rel_path.clone();
            child_path.push(child.name.clone());
            bind(child, Some(&config), child_path)
        })
        .collect();

    ResolvedNode {
        name: node.name,
        config,
        ops,
        children,
    }
}

/// Default function identifier: the slugged relative path joined with
/// hyphens, with the op name appended unless it is the default handler.
fn derived_function_name(rel_path: &[String], op_name: &str) -> String {
    let mut parts: Vec<String> = rel_path.iter().map(|s| slugify(s)).collect();
    if op_name != DEFAULT_HANDLER_OP || parts.is_empty() {
        parts.push(slugify(op_name));
    }
    parts.join("-")
}
