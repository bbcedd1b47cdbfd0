// src/dag/mod.rs

//! Dependency graph resolution.
//!
//! [`resolve`] turns a flat list of [`TaskDescriptor`](crate::task::TaskDescriptor)s
//! into a [`ResolvedSuite`]: `after` ids become index links, resource names
//! are validated and the whole graph is checked for cycles before anything
//! runs.

pub mod graph;

pub use graph::{ResolvedSuite, parse_resources, resolve, validate_graph};
