//! Discovery, preparation and sequencing of suites across directories.

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::outcome::Counts;
use crate::process::{self, EnvOverlay, Invocation, RunError, find_program};
use crate::suite::{Suite, SuiteReport, SuiteRunner};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Where suites come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A directory whose build system lists suites and generates their plans.
    Directory(PathBuf),
    /// An explicit manifest file, run as a single suite.
    Manifest(PathBuf),
}

/// A suite ready to run.
///
/// A generated plan lives in a temporary file next to the tests it references and
/// is deleted when the prepared suite is dropped, right after the suite ran.
#[derive(Debug)]
pub struct PreparedSuite {
    pub suite: Suite,
    plan: Option<NamedTempFile>,
}

impl PreparedSuite {
    /// The generated plan document, if the suite was discovered through the build system.
    pub fn plan_path(&self) -> Option<&Path> {
        self.plan.as_ref().map(NamedTempFile::path)
    }
}

/// The outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub suites: Vec<SuiteReport>,
    pub totals: Counts,
    pub aborted: bool,
    pub setup_errors: Vec<HarnessError>,
}

impl RunSummary {
    /// 130 if the run was interrupted, 1 if anything failed, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.aborted {
            130
        } else if self.totals.has_failures() || !self.setup_errors.is_empty() {
            1
        } else {
            0
        }
    }
}

/// Runs every suite of a set of targets, one after the other.
pub struct RunCoordinator<'a> {
    config: &'a HarnessConfig,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(config: &'a HarnessConfig, interrupt: Option<&'a AtomicBool>) -> Self {
        Self { config, interrupt }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Prepares all targets, then runs the suites that could be prepared.
    pub fn run(&self, targets: &[Target]) -> RunSummary {
        let started_at = Instant::now();
        let (prepared, setup_errors) = self.prepare(targets);
        for error in &setup_errors {
            warn!("{error}");
        }
        let mut summary = if self.is_interrupted() {
            warn!("run interrupted while preparing suites");
            RunSummary {
                aborted: true,
                ..RunSummary::default()
            }
        } else {
            self.run_prepared(prepared)
        };
        summary.setup_errors = setup_errors;
        info!(
            suites = summary.suites.len(),
            elapsed_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "{}",
            summary.totals
        );
        summary
    }

    /// Loads every suite before anything is executed.
    ///
    /// An interrupt stops the preparation without reporting an error.
    pub fn prepare(&self, targets: &[Target]) -> (Vec<PreparedSuite>, Vec<HarnessError>) {
        let mut prepared = Vec::new();
        let mut errors = Vec::new();
        if let Err(e) = self.preflight(&self.config.converter.program, &EnvOverlay::new()) {
            errors.push(e);
            return (prepared, errors);
        }
        for target in targets {
            if self.is_interrupted() {
                return (prepared, errors);
            }
            let result = match target {
                Target::Directory(directory) => self.prepare_directory(directory),
                Target::Manifest(manifest) => self.prepare_manifest(manifest).map(|s| vec![s]),
            };
            match result {
                Ok(suites) => prepared.extend(suites),
                Err(HarnessError::Interrupted) => return (prepared, errors),
                Err(e) => errors.push(e),
            }
        }
        if !self.config.dry_run {
            prepared.retain(|prepared| {
                match self.preflight(self.config.engine.program(), &prepared.suite.env()) {
                    Ok(()) => true,
                    Err(e) => {
                        errors.push(e);
                        false
                    }
                }
            });
        }
        (prepared, errors)
    }

    /// Runs the suites in order, deleting the plan of each one once it ran.
    pub fn run_prepared(&self, prepared: Vec<PreparedSuite>) -> RunSummary {
        let runner = SuiteRunner::new(self.config, self.interrupt);
        let mut summary = RunSummary::default();
        for prepared in prepared {
            let report = runner.run(&prepared.suite);
            drop(prepared);
            summary.totals += report.counts;
            summary.aborted = report.aborted;
            summary.suites.push(report);
            if summary.aborted {
                warn!("run interrupted");
                break;
            }
        }
        summary
    }

    fn preflight(&self, program: &str, env: &EnvOverlay) -> Result<(), HarnessError> {
        match find_program(program, env) {
            Some(path) => {
                debug!(program, path = %path.display(), "found tool");
                Ok(())
            }
            None => Err(HarnessError::tool(program, "command not found")),
        }
    }

    /// Names of the suites the build system of `directory` knows about.
    pub fn discover(&self, directory: &Path) -> Result<Vec<String>, HarnessError> {
        let output = self.build_output(self.config.build.list_invocation(), directory)?;
        let suites = output
            .split_whitespace()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        info!(directory = %directory.display(), suites = ?suites, "discovered suites");
        Ok(suites)
    }

    pub fn prepare_directory(&self, directory: &Path) -> Result<Vec<PreparedSuite>, HarnessError> {
        self.discover(directory)?
            .into_iter()
            .map(|name| -> Result<_, HarnessError> {
                let plan = self.build_output(self.config.build.plan_invocation(&name), directory)?;
                let mut file = tempfile::Builder::new()
                    .prefix(&format!(".sparqlcheck-{name}-"))
                    .suffix(".ttl")
                    .tempfile_in(directory)?;
                file.write_all(plan.as_bytes())?;
                file.flush()?;
                let suite = Suite::from_manifest(name, file.path(), self.config)?;
                Ok(PreparedSuite {
                    suite,
                    plan: Some(file),
                })
            })
            .collect()
    }

    pub fn prepare_manifest(&self, manifest: &Path) -> Result<PreparedSuite, HarnessError> {
        let name = manifest
            .file_stem()
            .map_or_else(|| manifest.display().to_string(), |s| s.to_string_lossy().into_owned());
        Ok(PreparedSuite {
            suite: Suite::from_manifest(name, manifest, self.config)?,
            plan: None,
        })
    }

    fn build_output(
        &self,
        invocation: Invocation,
        directory: &Path,
    ) -> Result<String, HarnessError> {
        let invocation = invocation
            .current_dir(directory)
            .timeout(self.config.timeout);
        let failure = |reason: String| HarnessError::BuildSystem {
            command: invocation.to_string(),
            directory: directory.to_owned(),
            reason,
        };
        let output = process::run(&invocation, self.interrupt).map_err(|e| match e {
            RunError::ToolNotFound { .. } => failure("command not found".into()),
            e @ RunError::Io { .. } => failure(e.to_string()),
        })?;
        if output.interrupted || self.is_interrupted() {
            debug!(command = %invocation, "build system interrupted");
            Err(HarnessError::Interrupted)
        } else if output.success() {
            Ok(output.stdout)
        } else if output.timed_out {
            Err(failure("timed out".into()))
        } else {
            Err(failure(format!(
                "exit code {}: {}",
                output.exit_code,
                output.stderr.trim()
            )))
        }
    }
}
