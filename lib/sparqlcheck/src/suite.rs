//! Execution of one suite of tests.

use crate::compare::Comparator;
use crate::config::HarnessConfig;
use crate::engine::{EngineRequest, ResultFormat};
use crate::error::HarnessError;
use crate::index::TripleIndex;
use crate::kind::TestKind;
use crate::manifest::{ManifestLoader, primary_node};
use crate::outcome::{Counts, ExecutionRecord, Expectation, Outcome, RunStatus, Signal};
use crate::process::{self, EnvOverlay, ProcessOutput, RunError};
use crate::query::QueryInfo;
use crate::results::{ResultLoader, Shape};
use crate::test_case::TestCase;
use crate::vocab::{rdfs, t};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Exit code of a process that stopped on SIGINT, as reported by shells.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// A named group of tests sharing a manifest and a working directory.
#[derive(Debug, Clone)]
pub struct Suite {
    pub directory: PathBuf,
    pub name: String,
    pub description: Option<String>,
    pub tests: Vec<TestCase>,
    /// Directory put first on `PATH` for every tool run in this suite.
    pub path_prefix: Option<PathBuf>,
}

impl Suite {
    /// Loads a suite from its manifest.
    ///
    /// The suite runs in the manifest directory. The manifest node may carry a
    /// `t:path` directory, relative to it, and an `rdfs:comment` describing the suite.
    pub fn from_manifest(
        name: impl Into<String>,
        manifest: &Path,
        config: &HarnessConfig,
    ) -> Result<Self, HarnessError> {
        let directory = manifest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_owned();
        let index = Arc::new(TripleIndex::parse(
            manifest,
            &config.converter,
            &EnvOverlay::new(),
            config.timeout,
        )?);
        let primary = primary_node(&index)?;
        let path_prefix = index
            .literal(primary, t::PATH)
            .map(|path| directory.join(path));
        let description = index.literal(primary, rdfs::COMMENT).map(str::to_owned);
        let mut suite = Self {
            directory,
            name: name.into(),
            description,
            tests: Vec::new(),
            path_prefix,
        };

        let mut loader = ManifestLoader::new(&config.converter, suite.env(), config.timeout);
        suite.tests = loader
            .load_index(index)?
            .iter()
            .filter_map(|entry| TestCase::from_entry(entry, config.run_entailment))
            .collect();
        info!(
            suite = %suite.name,
            tests = suite.tests.len(),
            manifest = %manifest.display(),
            "loaded suite"
        );
        Ok(suite)
    }

    /// The environment of every program run for this suite.
    pub fn env(&self) -> EnvOverlay {
        match &self.path_prefix {
            Some(prefix) => EnvOverlay::new().with_path_prefix(prefix),
            None => EnvOverlay::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteStatus {
    Pass,
    Fail,
}

impl fmt::Display for SuiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        })
    }
}

/// Everything that happened while running a suite.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub name: String,
    pub directory: PathBuf,
    pub description: Option<String>,
    pub records: Vec<ExecutionRecord>,
    pub counts: Counts,
    /// The run was interrupted while this suite was running.
    pub aborted: bool,
    pub elapsed: Duration,
}

impl SuiteReport {
    /// A suite fails if any test failed or unexpectedly passed.
    pub fn status(&self) -> SuiteStatus {
        if self.counts.has_failures() {
            SuiteStatus::Fail
        } else {
            SuiteStatus::Pass
        }
    }

    /// Records of tests that failed because the engine was killed by a signal.
    pub fn crashes(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter().filter(|r| r.is_crash())
    }
}

/// Runs suites one test at a time.
pub struct SuiteRunner<'a> {
    config: &'a HarnessConfig,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(config: &'a HarnessConfig, interrupt: Option<&'a AtomicBool>) -> Self {
        Self { config, interrupt }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn run(&self, suite: &Suite) -> SuiteReport {
        info!(suite = %suite.name, directory = %suite.directory.display(), "running suite");
        let started_at = Instant::now();
        let env = suite.env();
        let mut records = Vec::with_capacity(suite.tests.len());
        let mut counts = Counts::default();
        let mut aborted = false;
        for test in &suite.tests {
            if self.is_interrupted() {
                aborted = true;
                break;
            }
            let record = self.run_test(suite, test, &env);
            debug!(
                test = %record.test,
                outcome = %record.outcome,
                detail = %record.detail,
                "test done"
            );
            counts.record(record.outcome);
            aborted = record.interrupted;
            records.push(record);
            if aborted {
                warn!(suite = %suite.name, "interrupted, stopping");
                break;
            }
        }
        let report = SuiteReport {
            name: suite.name.clone(),
            directory: suite.directory.clone(),
            description: suite.description.clone(),
            records,
            counts,
            aborted,
            elapsed: started_at.elapsed(),
        };
        info!(
            suite = %suite.name,
            status = %report.status(),
            "{}",
            report.counts
        );
        report
    }

    /// Runs one test and derives its outcome.
    pub fn run_test(&self, suite: &Suite, test: &TestCase, env: &EnvOverlay) -> ExecutionRecord {
        if let Some(reason) = &test.skip_reason {
            return ExecutionRecord::skipped(&test.uri, &test.name, reason);
        }
        if !test.execute || test.expected == Expectation::Skip {
            return ExecutionRecord::skipped(&test.uri, &test.name, "not executable");
        }
        if self.config.dry_run {
            return ExecutionRecord::skipped(&test.uri, &test.name, "dry run");
        }
        let Some(query) = &test.query else {
            return ExecutionRecord::skipped(&test.uri, &test.name, "no query");
        };
        debug!(suite = %suite.name, "running {test}");

        let started_at = Instant::now();
        let verdict = if test.kind.is_syntax() {
            self.syntax_check(suite, test, query, env)
        } else if test.kind == TestKind::Warning {
            self.warning_check(suite, test, query, env)
        } else {
            self.evaluation(suite, test, query, env)
        };
        self.record(test, verdict, started_at.elapsed())
    }

    fn record(&self, test: &TestCase, verdict: Verdict, elapsed: Duration) -> ExecutionRecord {
        let mut record = ExecutionRecord {
            test: test.uri.clone(),
            name: test.name.clone(),
            outcome: Outcome::classify(test.expected, Some(verdict.status)),
            exit_code: None,
            signal: None,
            timed_out: false,
            interrupted: false,
            output: String::new(),
            elapsed,
            detail: verdict.detail,
        };
        let Some(output) = verdict.output else {
            return record;
        };
        record.exit_code = Some(output.exit_code);
        record.timed_out = output.timed_out;
        record.output = output.tail(self.config.output_tail_lines);
        record.elapsed = output.elapsed;
        if !output.timed_out {
            record.signal = Signal::from_exit_code(output.exit_code);
        }
        record.interrupted = output.interrupted
            || self.is_interrupted()
            || output.exit_code == INTERRUPTED_EXIT_CODE
            || record.signal.is_some_and(Signal::is_interrupt);
        if record.interrupted {
            record.outcome = Outcome::Failed;
            record.detail = "interrupted".into();
        } else if let Some(signal) = record.signal {
            warn!(test = %record.test, signal = %signal, "engine crashed");
            record.outcome = Outcome::Failed;
            record.detail = format!("engine killed by {signal}");
        }
        record
    }

    fn execute(
        &self,
        suite: &Suite,
        request: &EngineRequest<'_>,
        env: &EnvOverlay,
    ) -> Result<ProcessOutput, Verdict> {
        let invocation = self
            .config
            .engine
            .invocation(request)
            .current_dir(&suite.directory)
            .env(env.clone())
            .timeout(self.config.timeout);
        process::run(&invocation, self.interrupt).map_err(|e| {
            Verdict::failed(match e {
                RunError::ToolNotFound { program } => format!("engine {program} not found"),
                e @ RunError::Io { .. } => e.to_string(),
            })
        })
    }

    fn syntax_check(
        &self,
        suite: &Suite,
        test: &TestCase,
        query: &Path,
        env: &EnvOverlay,
    ) -> Verdict {
        let mut request = EngineRequest::new(query, test.language);
        request.parse_only = true;
        match self.execute(suite, &request, env) {
            Ok(output) => Verdict::from_exit(output, &[0], self.config.timeout),
            Err(verdict) => verdict,
        }
    }

    fn warning_check(
        &self,
        suite: &Suite,
        test: &TestCase,
        query: &Path,
        env: &EnvOverlay,
    ) -> Verdict {
        let mut request = EngineRequest::new(query, test.language);
        request.parse_only = true;
        request.warning_level = Some(self.config.warning_level);
        match self.execute(suite, &request, env) {
            Ok(output) => Verdict::from_exit(
                output,
                &[self.config.warning_exit_code, 0],
                self.config.timeout,
            ),
            Err(verdict) => verdict,
        }
    }

    fn evaluation(
        &self,
        suite: &Suite,
        test: &TestCase,
        query: &Path,
        env: &EnvOverlay,
    ) -> Verdict {
        let info = match QueryInfo::read(query) {
            Ok(info) => info,
            Err(e) => return Verdict::failed(format!("can not read {}: {e}", query.display())),
        };
        let result = test.result.as_deref();
        let format = self.output_format(test, info, result);
        let shape = Shape::select(info, format, result, test.cardinality);

        let mut request = EngineRequest::new(query, test.language);
        request.format = Some(format);
        request.data = &test.data;
        request.named_graphs = &test.named_graphs;
        let output = match self.execute(suite, &request, env) {
            Ok(output) => output,
            Err(verdict) => return verdict,
        };
        if !output.success() {
            return Verdict::from_exit(output, &[0], self.config.timeout);
        }
        let Some(result) = result else {
            return Verdict::failed_with(output, "no expected result declared");
        };
        if !result.is_file() {
            return Verdict::failed_with(
                output,
                format!("expected result {} does not exist", result.display()),
            );
        }

        let loader = ResultLoader::new(&self.config.converter, env, self.config.timeout);
        let actual = match loader.actual(&output.stdout, format, shape, info.ordered) {
            Ok(actual) => actual,
            Err(e) => {
                return Verdict::failed_with(
                    output,
                    format!("can not read {format} engine output: {e}"),
                );
            }
        };
        let expected = match loader.expected(result, shape, info.ordered) {
            Ok(expected) => expected,
            Err(e) => {
                return Verdict::failed_with(
                    output,
                    format!("can not read expected result {}: {e}", result.display()),
                );
            }
        };
        let comparison = Comparator::new(
            self.config.compare_tool.as_ref(),
            self.config.diff_tool.as_ref(),
            env,
            self.config.timeout,
        )
        .compare(&actual, &expected, test.cardinality);
        if comparison.equal {
            Verdict {
                status: RunStatus::Passed,
                output: Some(output),
                detail: String::new(),
            }
        } else {
            Verdict::failed_with(
                output,
                comparison
                    .diff
                    .unwrap_or_else(|| "results differ".into()),
            )
        }
    }

    /// The format the engine is asked to print results in.
    fn output_format(
        &self,
        test: &TestCase,
        info: QueryInfo,
        result: Option<&Path>,
    ) -> ResultFormat {
        let extension = result
            .and_then(|r| r.extension())
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if test.kind == TestKind::CsvResultFormat || extension.as_deref() == Some("csv") {
            ResultFormat::Csv
        } else if extension.as_deref() == Some("tsv") {
            ResultFormat::Tsv
        } else if info.form.returns_graph() {
            ResultFormat::NTriples
        } else {
            self.config.result_format
        }
    }
}

/// The run status of an executed test, before expectations are applied.
struct Verdict {
    status: RunStatus,
    output: Option<ProcessOutput>,
    detail: String,
}

impl Verdict {
    fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            output: None,
            detail: detail.into(),
        }
    }

    fn failed_with(output: ProcessOutput, detail: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            output: Some(output),
            detail: detail.into(),
        }
    }

    /// Passed iff the engine exited with one of `accepted`.
    fn from_exit(output: ProcessOutput, accepted: &[i32], timeout: Duration) -> Self {
        let (status, detail) = if output.timed_out {
            (RunStatus::Failed, format!("timed out after {}s", timeout.as_secs()))
        } else if accepted.contains(&output.exit_code) && !output.interrupted {
            (RunStatus::Passed, String::new())
        } else {
            (
                RunStatus::Failed,
                format!("engine exited with code {}", output.exit_code),
            )
        };
        Self {
            status,
            output: Some(output),
            detail,
        }
    }
}
