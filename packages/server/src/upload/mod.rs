pub mod client;
pub mod orchestrator;
pub mod partition;

pub use client::{WorkflowClient, WorkflowError, WorkflowUser};
