//! Command-line surface of zli.
//!
//! ```text
//! argv ──► entrypoint::split_reserved ──► reserved flag? ──► introspect / snapshot / scaffold
//!                    │
//!                    ▼
//!          cache or discovery ──► dispatch::build_command ──► clap matches
//!                                                                 │
//!                                                                 ▼
//!                                 dispatch::resolve ──► run_action ──► NodeRunner
//! ```
//!
//! - [`entrypoint`] - argv handling, phases and exit codes
//! - [`dispatch`] - clap registration and the action handler
//! - [`introspect`] - name map and dependency listing

pub mod dispatch;
pub mod entrypoint;
pub mod introspect;

pub use dispatch::{ActionOutcome, DispatchError, Invocation};
pub use entrypoint::{EntryOptions, run, run_with_args};
