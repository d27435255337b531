//! Execution layer - the task-function contract and the shadow fan-out.

#![warn(missing_docs)]

pub mod task;
pub mod fanout;

pub use task::{ShadowTask, TaskContext};
pub use fanout::FanOut;
