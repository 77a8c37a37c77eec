//! Function-calling surface for LLM clients.

pub mod registry;

pub use registry::*;
