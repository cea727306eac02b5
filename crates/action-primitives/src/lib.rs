//! L3 Action Primitives - named page actions dispatched by step type
//!
//! This crate provides the action layer of the workflow engine:
//! - `ActionRegistry`: name/alias → handler dispatch table
//! - 5 built-in actions: input, click, wait_response, extract, download
//! - `Tempo` pacing so tests can run without fixed pauses

pub mod errors;
mod primitives;
mod registry;
pub mod types;

pub use errors::*;
pub use primitives::*;
pub use registry::*;
pub use types::*;
