//! Review URI resolution over local git checkouts.
//!
//! Library half of the binary: the CLI surface, config loading, and the
//! git2-backed implementation of the `revfs-core` backend seams.

pub mod cli;
pub mod config;
pub mod git;
