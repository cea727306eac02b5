//! Flow Orchestration Layer
//!
//! Runs a declarative workflow one step at a time against a single page:
//! navigation, gateway and login waits, then dispatch through the action
//! registry. The first failing step ends the run.

pub mod errors;
pub mod executor;
pub mod templates;
pub mod types;

pub use errors::FlowError;
pub use executor::WorkflowProcessor;
pub use types::Pacing;
