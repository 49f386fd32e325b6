//! Fatal error types for the build and run pipelines.
//!
//! Recoverable problems (a missing file at build time, a broken record at
//! load time) never show up here; they are logged with `warn!` and skipped.

use std::io;

use thiserror::Error;

/// A fatal problem with the CX source, tied to the 1-based line it was
/// found on. Validation errors use line 0.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("CX Error at line {line}: {kind}")]
pub struct CompileError {
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(line: usize, kind: CompileErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("line is {len} bytes long (max {max})")]
    LineTooLong { len: usize, max: usize },
    #[error("token is longer than {max} bytes")]
    TokenTooLong { max: usize },
    #[error("invalid {0} statement")]
    InvalidStatement(&'static str),
    #[error("expected string {what}")]
    ExpectedString { what: &'static str },
    #[error("expected `{expected}` {context}, found `{found}`")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        context: &'static str,
    },
    #[error("unknown files.add kind \"{0}\" (expected \"folder\" or \"file\")")]
    UnknownFilesKind(String),
    #[error("{field} is longer than {max} bytes")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("too many {what} (max {max})")]
    CapacityExceeded { what: &'static str, max: usize },
    #[error("class \"{0}\" is defined more than once")]
    DuplicateClass(String),
    #[error("class \"{name}\" opened at line {opened_at} is never finished")]
    UnterminatedClass { name: String, opened_at: usize },
    #[error("Missing cx.project.name")]
    MissingProjectName,
    #[error("Missing program statement")]
    MissingProgram,
    #[error("Program class not found")]
    ProgramClassNotFound,
    #[error("Missing cx.app.shell")]
    MissingShell,
    #[error("Missing cx.app.class")]
    MissingAppClass,
    #[error("CX app class not found")]
    AppClassNotFound,
}

/// A fatal problem while writing, reading or launching a package.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("invalid .cxA file (bad magic)")]
    BadMagic,
    #[error("unsupported .cxA version {0}")]
    UnsupportedVersion(u32),
    #[error("package truncated while reading {what}")]
    Truncated { what: &'static str },
    #[error("cannot compress {what}: {source}")]
    Compress {
        what: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("cannot decompress {what}")]
    Decompress { what: &'static str },
    #[error("{what} does not fit in a 32-bit length field")]
    TooLarge { what: &'static str },
    #[error("invalid settings record: {0}")]
    Settings(#[from] serde_json::Error),
    #[error("cannot find shell command in settings")]
    MissingShell,
    #[error("unbalanced quote in shell command `{0}`")]
    UnbalancedQuote(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl PackageError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
