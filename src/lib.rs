//! localup-inspect - inspect requests captured by a localup tunnel agent
//!
//! The binary is a thin wrapper; argument parsing, configuration and the
//! subcommand handlers live here so they can be tested directly.

pub mod cli;
pub mod commands;
pub mod config;
