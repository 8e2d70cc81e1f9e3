//! Error taxonomy for the discovery phase.
//!
//! Every error here is fatal for the whole invocation: a command tree with a
//! missing command is never dispatched. Each kind carries the originating
//! path so failures stay attributable across hundreds of command files.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The file could not be read or is not syntactically valid.
#[derive(Debug, Clone, Error)]
pub struct ParseError {
    pub path: PathBuf,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ParseError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed parsing {}", self.path.display())?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " (line {line}, col {column})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// A visitor rejected a node while walking the tree.
#[derive(Debug, Clone, Error)]
#[error("{message} (line {line})")]
pub struct VisitError {
    pub message: String,
    pub line: usize,
}

impl VisitError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// What went wrong underneath a [`TraversalError`].
#[derive(Debug, Clone, Error)]
pub enum TraversalCause {
    #[error(transparent)]
    Parse(ParseError),
    #[error(transparent)]
    Visit(VisitError),
}

/// Extraction failed. The message joins the extraction call's own context
/// with the inner parse/visitor message; the inner error is its
/// `source()` and is also reachable through [`TraversalError::cause`].
#[derive(Debug, Clone, Error)]
#[error("{context}: {cause}")]
pub struct TraversalError {
    pub path: PathBuf,
    pub context: String,
    #[source]
    cause: TraversalCause,
}

impl TraversalError {
    pub fn new(path: &Path, context: impl Into<String>, cause: TraversalCause) -> Self {
        Self {
            path: path.to_path_buf(),
            context: context.into(),
            cause,
        }
    }

    pub fn cause(&self) -> &TraversalCause {
        &self.cause
    }

    /// The underlying parse failure, if the file never made it to the walker.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match &self.cause {
            TraversalCause::Parse(err) => Some(err),
            TraversalCause::Visit(_) => None,
        }
    }
}

/// A node outside the supported literal subset was found in an option literal.
#[derive(Debug, Clone, Error)]
#[error("unsupported `{node}` in option literal of {} (line {line})", .path.display())]
pub struct GenerationError {
    pub path: PathBuf,
    pub node: &'static str,
    pub line: usize,
}

/// The literal could not be turned into a usable command descriptor.
///
/// `generated` holds the regenerated source of the offending fragment so it
/// can be printed next to the error.
#[derive(Debug, Clone, Error)]
#[error(
    "could not evaluate options in {}, please make sure they follow conventions.\n Originating error: {message}",
    .path.display()
)]
pub struct CompileError {
    pub path: PathBuf,
    pub message: String,
    pub generated: Option<String>,
}

impl CompileError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
            generated: None,
        }
    }

    pub fn with_generated(mut self, generated: Option<String>) -> Self {
        self.generated = generated;
        self
    }
}

/// Any failure of the discovery phase.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("{0}")]
    Traversal(#[from] TraversalError),
    #[error("{0}")]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    Compile(#[from] CompileError),
    #[error("could not read command root {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid exclude pattern: {0}")]
    Exclude(#[from] globset::Error),
}

impl DiscoveryError {
    /// Path of the file (or directory) the failure is attributed to.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DiscoveryError::Traversal(err) => Some(&err.path),
            DiscoveryError::Generation(err) => Some(&err.path),
            DiscoveryError::Compile(err) => Some(&err.path),
            DiscoveryError::Io { path, .. } => Some(path),
            DiscoveryError::Exclude(_) => None,
        }
    }

    /// Regenerated source of the offending fragment, when there is one.
    pub fn generated_source(&self) -> Option<&str> {
        match self {
            DiscoveryError::Compile(err) => err.generated.as_deref(),
            _ => None,
        }
    }
}
