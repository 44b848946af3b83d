//! Sparqlcheck is a conformance harness for SPARQL query processors.
//!
//! It reads test manifests written with the [W3C test manifest vocabulary](https://www.w3.org/2001/sw/DataAccess/tests/README),
//! runs the query processor under test as an external program for each test and
//! compares what it prints with the expected results.
//!
//! Manifests and RDF result documents are turned into N-Triples by an external
//! converter, so the harness does not need to parse Turtle or RDF/XML itself.
//!
//! Usage example:
//! ```no_run
//! use sparqlcheck::{HarnessConfig, RunCoordinator, Target};
//!
//! let config = HarnessConfig::default();
//! let summary = RunCoordinator::new(&config, None)
//!     .run(&[Target::Manifest("testsuite/manifest.ttl".into())]);
//! for suite in &summary.suites {
//!     println!("{}: {} ({})", suite.name, suite.status(), suite.counts);
//! }
//! std::process::exit(summary.exit_code());
//! ```
#![doc(test(attr(deny(warnings))))]

pub mod compare;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod index;
pub mod kind;
pub mod manifest;
pub mod outcome;
pub mod plan;
pub mod process;
pub mod query;
pub mod results;
pub mod suite;
pub mod test_case;
pub mod vocab;

pub use crate::compare::{Cardinality, Comparator, Comparison, compare};
pub use crate::config::{BuildTool, HarnessConfig, Tool};
pub use crate::coordinator::{PreparedSuite, RunCoordinator, RunSummary, Target};
pub use crate::engine::{EngineProfile, EngineRequest, ResultFormat};
pub use crate::error::{HarnessError, ResultsError};
pub use crate::kind::{Language, TestKind};
pub use crate::outcome::{Counts, ExecutionRecord, Expectation, Outcome, RunStatus, Signal};
pub use crate::plan::PlanBuilder;
pub use crate::process::{EnvOverlay, Invocation, ProcessOutput, RunError};
pub use crate::results::{QueryResult, Shape};
pub use crate::suite::{Suite, SuiteReport, SuiteRunner, SuiteStatus};
pub use crate::test_case::TestCase;
