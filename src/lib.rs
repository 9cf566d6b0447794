//! Stacksmith - serverless handler-tree template synthesis
//!
//! This crate turns a tree of handler modules and per-handler
//! configuration fragments into a deduplicated infrastructure template.
//! Configuration values inherit down the tree without overwriting
//! anything concrete, resource descriptors are derived lazily and
//! memoized so every cross-reference sees the same object, and every
//! logical id is a pure function of the handler's position in the tree.

pub mod config;
pub mod derive;
pub mod error;
pub mod field;
pub mod naming;
pub mod reference;
pub mod resource;
pub mod synth;
pub mod tree;

pub use config::resolve::{resolve, ResolveOptions, ResolvedNode};
pub use config::{FuncConfig, FunctionCode, VpcConfig};
pub use derive::ResourceConfig;
pub use error::DeriveError;
pub use field::Field;
pub use reference::ResourceRef;
pub use resource::{Resource, ResourceKind, Template};
pub use synth::synthesize;
pub use tree::{HandlerNode, HandlerOp};
