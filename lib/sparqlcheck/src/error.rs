use std::io;
use std::path::PathBuf;

/// A setup error: something that prevents a suite from being prepared.
///
/// These are reported before any test of the run executes.
/// Per-test problems are never returned as errors, they become outcomes.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// An external tool is missing or failed to do its job.
    #[error("{tool} is not usable: {reason}")]
    ToolNotFound { tool: String, reason: String },
    /// The manifest has no node exposing `mf:entries` or `mf:include`.
    #[error("{}: no manifest node with entries or include found", path.display())]
    Manifest { path: PathBuf },
    /// An RDF list never reaches `rdf:nil`.
    #[error("{}: the RDF list starting at {head} is not terminated by rdf:nil", path.display())]
    UnterminatedList { path: PathBuf, head: String },
    /// A manifest includes itself, directly or transitively.
    #[error("{}: manifest inclusion cycle", path.display())]
    ManifestCycle { path: PathBuf },
    /// The build system failed to list suites or to produce a plan.
    #[error("{command} failed in {}: {reason}", directory.display())]
    BuildSystem {
        command: String,
        directory: PathBuf,
        reason: String,
    },
    /// The run was interrupted while the suite was being prepared.
    #[error("interrupted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HarnessError {
    pub(crate) fn tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolNotFound {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// Error returned when a query result document can not be read.
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Results(#[from] sparesults::QueryResultsParseError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Msg(String),
}

impl ResultsError {
    pub(crate) fn msg(msg: impl Into<String>) -> Self {
        Self::Msg(msg.into())
    }
}
