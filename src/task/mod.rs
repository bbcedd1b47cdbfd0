// src/task/mod.rs

//! Task data model.
//!
//! - [`descriptor`] is what callers hand to the resolver: an id, a body and
//!   optional `after` / `resources` / `skip` metadata.
//! - [`model`] is the resolved, schedulable [`Task`] whose status is owned by
//!   the runner.
//! - [`resource`] holds the validated [`ResourceName`] newtype.

pub mod descriptor;
pub mod model;
pub mod resource;

pub use descriptor::{BodyFuture, SkipPredicate, TaskBody, TaskDescriptor};
pub use model::{Task, TaskFailure, TaskIndex, TaskStatus};
pub use resource::ResourceName;
