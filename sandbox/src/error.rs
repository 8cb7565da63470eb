use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use doccheck::source::LoadError;

use crate::assert::AssertionFailure;

/// Conditions that abort checking of one document.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("invalid config '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot read config '{}': {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Raised while compiling a block or its prolog. The block did not run.
    Compile,
    /// Raised while running: an uncaught error, a failed assertion, or a timeout.
    Run,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Compile => write!(f, "compile error"),
            FailureKind::Run => write!(f, "run error"),
        }
    }
}

/// A compile or run failure of one block, positioned in expanded-document lines.
#[derive(Debug, Clone)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Expanded line index implicated by the failure.
    pub line: usize,
    /// The document text of that line, before any rewriting.
    pub source_line: String,
    /// Actual/expected values when the failure is a failed assertion.
    pub assertion: Option<AssertionFailure>,
    /// Call frames leading to the error, innermost last.
    pub context: Vec<String>,
}

impl Failure {
    pub fn is_assertion(&self) -> bool {
        self.assertion.is_some()
    }
}
