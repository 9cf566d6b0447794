//! Template synthesis: walk the resolved tree pre-order and collect
//! every derivable resource.
//!
//! The walk is deterministic: node before operations, operations and
//! children in authored order, a fixed kind order per operation. A
//! skippable derivation outcome (a structural precondition that simply
//! does not hold here) is dropped; every other error aborts synthesis.

use std::rc::Rc;

use crate::config::resolve::ResolvedNode;
use crate::error::DeriveError;
use crate::resource::{Resource, Template};

/// Synthesize the full template for a resolved tree.
pub fn synthesize(root: &ResolvedNode) -> Result<Template, DeriveError> {
    let mut template = Template::new();
    synthesize_node(root, &mut template)?;
    Ok(template)
}

fn synthesize_node(node: &ResolvedNode, template: &mut Template) -> Result<(), DeriveError> {
    step_one(template, node.config.api_resource())?;

    for op in &node.ops {
        step_one(template, op.function())?;
        step_one(template, op.api_method())?;
        step_one(template, op.method_permission())?;
        step_one(template, op.cors_method())?;
        step_one(template, op.authorizer())?;
        step_many(template, op.schedule_rules())?;
        step_many(template, op.schedule_permissions())?;
    }

    for child in &node.children {
        synthesize_node(child, template)?;
    }
    Ok(())
}

/// Fold one derivation outcome into the template.
///
/// Cross-references may have materialized a descriptor before the walk
/// reaches it; the template's duplicate no-op keeps exactly one entry
/// either way.
fn step_one(
    template: &mut Template,
    outcome: Result<Option<Rc<Resource>>, DeriveError>,
) -> Result<(), DeriveError> {
    match outcome {
        Ok(Some(resource)) => {
            template.insert(resource);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) if err.is_skippable() => Ok(()),
        Err(err) => Err(err),
    }
}

fn step_many(
    template: &mut Template,
    outcome: Result<Option<Vec<Rc<Resource>>>, DeriveError>,
) -> Result<(), DeriveError> {
    match outcome {
        Ok(Some(resources)) => {
            for resource in resources {
                template.insert(resource);
            }
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) if err.is_skippable() => Ok(()),
        Err(err) => Err(err),
    }
}
