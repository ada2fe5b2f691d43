//! Local git integration.
//!
//! Implements the engine's backend seams over local checkouts. Each
//! checkout is served by a background `std::thread::spawn` thread that
//! holds the `git2::Repository` for its lifetime; Repository is !Send, so
//! it must never cross a thread boundary.

pub mod backend;
pub mod types;
pub mod worker;
