//! notemerge: merge markdown notes from a vault into a single document
//!
//! Layers, innermost first:
//! - `domain`: entities, collection and ordering (pure)
//! - `application`: merge and vault services over I/O boundary traits
//! - `infrastructure`: real I/O implementations and service wiring
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
