//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `nb-mirror` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `nb_mirror` library to do the work.

pub mod completions;
pub mod convert;
pub mod diff;
pub mod run;
