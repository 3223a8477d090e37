//! CLI command implementations.

pub mod bounds;
pub mod common;
pub mod config;
pub mod generate;
pub mod optimize;
pub mod overlay;
pub mod process;
