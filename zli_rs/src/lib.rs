//! # zli
//!
//! **Command-file CLI framework.** Every JavaScript file under a command
//! root may export an `OPTS` object literal describing one command and a
//! `DEPS` array naming the tools it needs. zli reads those literals
//! statically (nothing in the file is executed), assembles them into a
//! command tree mirroring the directory layout, and dispatches argv to the
//! matching file.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use zli::{analyzer, config::ZliConfig, context::Context};
//!
//! let cwd = PathBuf::from(".");
//! let config = ZliConfig::load(&cwd).unwrap();
//! let ctx = Context::new(config, cwd);
//! let tree = analyzer::discover(&ctx).unwrap();
//! for (trail, node) in tree.walk() {
//!     println!("{} > {}", trail.join(" "), node.name);
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! zli --configure --root zli_commands   # seed .zli.toml and a command root
//! zli deploy --tag v1 --staging         # run commands/deploy.js
//! zli --show-arg-name-map               # commands and their flags
//! zli --write-cache                     # snapshot the tree for faster starts
//! ```

// ============================================================================
// Discovery
// ============================================================================

/// Static extraction and evaluation of command files.
///
/// # Submodules
///
/// - [`analyzer::parser`] - oxc parse with scope analysis
/// - [`analyzer::walker`] - visitor over top-level declarations
/// - [`analyzer::extractor`] - `OPTS` and `DEPS` extraction
/// - [`analyzer::evaluator`] - literal evaluation against the globals
/// - [`analyzer::codegen`] - source regeneration for diagnostics and the cache
pub mod analyzer;

/// `.zli.toml` loading.
pub mod config;

/// Per-invocation ambient state shared by every phase.
pub mod context;

/// Command file gathering.
pub mod fs_utils;

/// Short flag assignment and file naming.
pub mod naming;

/// Cache artifact holding the assembled tree.
pub mod snapshot;

/// Merging descriptors into the command tree.
pub mod tree;

/// Descriptors, options, runtimes and hooks.
///
/// # Key Types
///
/// - [`CommandDescriptor`] - one command
/// - [`CommandTree`] - the merged namespace
/// - [`OptionSpec`] - one flag
/// - [`RuntimeFlags`] - runtimes selected at invocation time
pub mod types;

// ============================================================================
// Command line
// ============================================================================

/// Entry point, dispatch and introspection.
pub mod cli;

/// stderr styling.
pub mod colors;

/// `--configure` scaffolding.
pub mod scaffold;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use analyzer::{DiscoveryError, discover};
pub use config::ZliConfig;
pub use context::Context;
pub use types::{CommandDescriptor, CommandTree, OptionSpec, OptionType, Runtime, RuntimeFlags};
