// src/exec/mod.rs

//! Task execution layer.
//!
//! This module runs the build tasks picked by the scheduler on the Tokio
//! runtime and reports back to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the main executor loop.
//! - [`task_runner`] runs one task and reports its outcome.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
