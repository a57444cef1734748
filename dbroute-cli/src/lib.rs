//! dbroute CLI - command-line interface for dbroute.
//!
//! This crate provides the `dbroute` binary, which runs connection
//! resolution against the current environment and prints the result.

pub mod cli;
pub mod commands;
pub mod env;
pub mod error;
pub mod output;
