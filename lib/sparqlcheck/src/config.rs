//! Harness configuration: external tools, timeouts and run options.

use crate::engine::{EngineProfile, ResultFormat};
use crate::process::Invocation;
use std::time::Duration;

/// An external program together with the arguments put before its operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub program: String,
    pub args: Vec<String>,
}

impl Tool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args<I: IntoIterator<Item = S>, S: Into<String>>(mut self, args: I) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::new(&self.program).args(&self.args)
    }
}

/// How suites are discovered and their plans generated.
///
/// With the defaults, `make -s get-testsuites-list` lists the suites of a directory
/// and `make -s get-testsuite-NAME` prints the plan of suite `NAME`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTool {
    pub tool: Tool,
    pub list_target: String,
    pub plan_target_prefix: String,
}

impl Default for BuildTool {
    fn default() -> Self {
        Self {
            tool: Tool::new("make").with_args(["-s"]),
            list_target: "get-testsuites-list".into(),
            plan_target_prefix: "get-testsuite-".into(),
        }
    }
}

impl BuildTool {
    pub fn list_invocation(&self) -> Invocation {
        self.tool.invocation().arg(&self.list_target)
    }

    pub fn plan_invocation(&self, suite: &str) -> Invocation {
        self.tool
            .invocation()
            .arg(format!("{}{suite}", self.plan_target_prefix))
    }
}

/// Everything a run needs to know about its environment.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// RDF to N-Triples converter, called as `converter [args] FILE`.
    pub converter: Tool,
    pub engine: EngineProfile,
    pub build: BuildTool,
    /// Bound of every engine and tool invocation.
    pub timeout: Duration,
    /// Engine output format for SELECT and ASK queries, unless a test needs a specific one.
    pub result_format: ResultFormat,
    /// Warning level passed to the engine for warning tests.
    pub warning_level: u8,
    /// Exit code the engine uses to signal that it emitted warnings.
    pub warning_exit_code: i32,
    /// Optional semantic result comparison tool, called as `tool EXPECTED ACTUAL`.
    pub compare_tool: Option<Tool>,
    /// Optional diff tool, called as `tool EXPECTED ACTUAL`.
    pub diff_tool: Option<Tool>,
    pub dry_run: bool,
    /// Run tests declaring an entailment regime instead of skipping them.
    pub run_entailment: bool,
    /// Number of output lines kept in execution records.
    pub output_tail_lines: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            converter: Tool::new("to-ntriples"),
            engine: EngineProfile::default(),
            build: BuildTool::default(),
            timeout: Duration::from_secs(30),
            result_format: ResultFormat::Simple,
            warning_level: 1,
            warning_exit_code: 2,
            compare_tool: None,
            diff_tool: None,
            dry_run: false,
            run_entailment: false,
            output_tail_lines: 20,
        }
    }
}
