// src/exec/mod.rs

//! Process execution for suite-file tasks.
//!
//! Suite files describe task bodies as shell commands; [`CommandBody`] is
//! the [`TaskBody`](crate::task::TaskBody) that runs one with
//! `tokio::process::Command`. Library callers can use any async closure
//! instead.

pub mod command;

pub use command::CommandBody;
