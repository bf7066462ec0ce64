//! session-sync - keep agent session logs in sync between machines
//!
//! Session logs embed absolute paths and escaped directory names that differ
//! between a server and a workstation. This crate copies them over rsync and
//! rewrites those paths on the way, so a session started on one machine can
//! be resumed on the other.
//!
//! # Architecture
//!
//! - [`rewrite`] - Rule store, direction pipelines and content rewriting
//! - [`model`] - Project mappings, sync modes and directions
//! - [`registry`] - Mapping lookup and direction policy
//! - [`config`] - Configuration loading and validation
//! - [`sync`] - Orchestrator, transports and sync status
//! - [`scan`] - Project directory discovery
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod rewrite;
pub mod scan;
pub mod sync;

pub use error::{Error, Result};
