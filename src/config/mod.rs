//! Configuration Management
//!
//! Per-phase configuration with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Optional TOML file
//! 3. Typed environment variables (PHASE15_*, PHASE_4_5_*, PIPELINE_*)
//! 4. Environment profile overlay

mod loader;
mod types;

pub use loader::{ConfigLoader, ENV_KEYS};
pub use types::*;
