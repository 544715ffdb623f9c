//! meshreg CLI
//!
//! Command-line interface for the mesh address and peer registry.

pub mod commands;
pub mod output;
pub mod settings;
