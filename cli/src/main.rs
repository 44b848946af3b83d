use anyhow::{Context, bail};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueHint};
use oxrdf::NamedNode;
use sparqlcheck::{
    HarnessConfig, PlanBuilder, ResultFormat, RunCoordinator, RunSummary, Target, TestKind, Tool,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod interrupt;
mod report;

#[derive(Parser)]
#[command(about, version, name = "sparqlcheck")]
/// Conformance harness for SPARQL query processors.
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Log debug messages.
    ///
    /// Ignored if RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Write logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run test suites and report their outcomes.
    ///
    /// Directories are asked for their suites through the build system,
    /// files are read as manifests and run as a single suite each.
    Run {
        /// Directories or manifest files.
        #[arg(required = true, value_hint = ValueHint::AnyPath)]
        targets: Vec<PathBuf>,
        #[command(flatten)]
        harness: HarnessArgs,
        /// Write a JUnit XML report to this file.
        #[arg(long, value_hint = ValueHint::FilePath)]
        junit: Option<PathBuf>,
        /// Write EARL assertions in N-Triples to this file.
        #[arg(long, value_hint = ValueHint::FilePath)]
        earl: Option<PathBuf>,
    },
    /// Print the tests the manifests of the targets describe, without running them.
    ListTests {
        /// Directories or manifest files.
        #[arg(required = true, value_hint = ValueHint::AnyPath)]
        targets: Vec<PathBuf>,
        #[command(flatten)]
        harness: HarnessArgs,
    },
    /// Print a manifest listing the query files of a directory.
    ///
    /// The output is N-Triples and can be printed by a build system target.
    Plan {
        /// Directory holding the .rq and .ru files.
        #[arg(value_hint = ValueHint::DirPath)]
        directory: PathBuf,
        /// Name of the suite, used to guess the kind of the tests.
        ///
        /// Defaults to the directory name.
        #[arg(long)]
        suite: Option<String>,
        /// IRI of the test type given to every test.
        #[arg(long)]
        kind: Option<String>,
        /// Description of the suite.
        #[arg(long)]
        description: Option<String>,
        /// Directory, relative to the suite, put first on PATH while the suite runs.
        #[arg(long)]
        path: Option<String>,
        /// Default graph file added to every evaluation test.
        #[arg(long, value_hint = ValueHint::FilePath)]
        data: Vec<PathBuf>,
    },
}

#[derive(ClapArgs)]
struct HarnessArgs {
    /// Program converting RDF files to N-Triples on its standard output.
    #[arg(long, env = "TO_NTRIPLES", default_value = "to-ntriples")]
    converter: String,
    /// Query processor under test.
    #[arg(long, env = "ROQET", default_value = "roqet")]
    engine: String,
    /// Build system program used to discover the suites of a directory.
    #[arg(long, default_value = "make")]
    build_tool: String,
    /// Timeout of each invocation, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    /// Engine output format for SELECT and ASK queries.
    #[arg(long, default_value = "simple")]
    format: ResultFormat,
    /// Warning level passed to the engine for warning tests.
    #[arg(long, default_value_t = 1)]
    warning_level: u8,
    /// Semantic comparison tool, called with the expected and actual files.
    #[arg(long)]
    compare_tool: Option<String>,
    /// Diff tool, called with the expected and actual files.
    #[arg(long)]
    diff_tool: Option<String>,
    /// Record every test as skipped without running anything.
    #[arg(long)]
    dry_run: bool,
    /// Run tests that declare an entailment regime.
    #[arg(long)]
    entailment: bool,
}

impl HarnessArgs {
    fn config(&self) -> HarnessConfig {
        let mut config = HarnessConfig {
            converter: tool(&self.converter),
            timeout: Duration::from_secs(self.timeout),
            result_format: self.format,
            warning_level: self.warning_level,
            compare_tool: self.compare_tool.as_deref().map(tool),
            diff_tool: self.diff_tool.as_deref().map(tool),
            dry_run: self.dry_run,
            run_entailment: self.entailment,
            ..HarnessConfig::default()
        };
        config.engine.tool = tool(&self.engine);
        config.build.tool.program.clone_from(&self.build_tool);
        config
    }
}

/// A command line: the program followed by its leading arguments.
fn tool(command: &str) -> Tool {
    let mut parts = command.split_whitespace();
    Tool::new(parts.next().unwrap_or_default()).with_args(parts)
}

fn targets(paths: &[PathBuf]) -> anyhow::Result<Vec<Target>> {
    paths
        .iter()
        .map(|path| {
            if path.is_dir() {
                Ok(Target::Directory(path.clone()))
            } else if path.is_file() {
                Ok(Target::Manifest(path.clone()))
            } else {
                bail!("{} is neither a directory nor a file", path.display())
            }
        })
        .collect()
}

fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub fn main() -> anyhow::Result<ExitCode> {
    let matches = Args::parse();
    init_logging(matches.verbose, matches.log_json);
    match matches.command {
        Command::Run {
            targets: paths,
            harness,
            junit,
            earl,
        } => {
            let config = harness.config();
            let targets = targets(&paths)?;
            let interrupt = interrupt::install();
            let summary = RunCoordinator::new(&config, Some(interrupt)).run(&targets);
            print_summary(&summary)?;
            if let Some(path) = junit {
                write_report(&path, &report::junit(&summary)?)?;
            }
            if let Some(path) = earl {
                write_report(&path, &report::earl(&summary, config.engine.program())?)?;
            }
            Ok(ExitCode::from(u8::try_from(summary.exit_code()).unwrap_or(1)))
        }
        Command::ListTests {
            targets: paths,
            harness,
        } => {
            let config = HarnessConfig {
                dry_run: true,
                ..harness.config()
            };
            let targets = targets(&paths)?;
            let (prepared, errors) = RunCoordinator::new(&config, None).prepare(&targets);
            let mut stdout = io::stdout().lock();
            for suite in &prepared {
                for test in &suite.suite.tests {
                    writeln!(stdout, "{}\t{}\t{test}", suite.suite.name, test.uri)?;
                }
            }
            if let Some(error) = errors.into_iter().next() {
                return Err(error).context("failed to load the tests");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan {
            directory,
            suite,
            kind,
            description,
            path,
            data,
        } => {
            let suite = match suite {
                Some(suite) => suite,
                None => directory
                    .canonicalize()
                    .with_context(|| format!("failed to open {}", directory.display()))?
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            let mut builder = PlanBuilder::new(suite);
            if let Some(kind) = kind {
                let iri = NamedNode::new(&kind)
                    .with_context(|| format!("invalid test type {kind}"))?;
                builder = builder.with_kind(TestKind::from_iri(iri.as_ref()));
            }
            if let Some(description) = description {
                builder = builder.with_description(description);
            }
            if let Some(path) = path {
                builder = builder.with_path(path);
            }
            for data in data {
                builder = builder.with_data(data);
            }
            let plan = builder
                .build(&directory)
                .with_context(|| format!("failed to list the queries of {}", directory.display()))?;
            io::stdout().lock().write_all(plan.as_bytes())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(summary: &RunSummary) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    for suite in &summary.suites {
        writeln!(
            stdout,
            "{}: {} ({}) in {:.2}s",
            suite.name,
            suite.status(),
            suite.counts,
            suite.elapsed.as_secs_f32()
        )?;
        for record in suite.records.iter().filter(|r| r.outcome.is_failure()) {
            writeln!(stdout, "  {} {}: {}", record.outcome, record.name, record.detail)?;
        }
        for record in suite.crashes() {
            writeln!(stdout, "  crash {}: {}", record.name, record.detail)?;
        }
    }
    for error in &summary.setup_errors {
        writeln!(stdout, "error: {error}")?;
    }
    writeln!(stdout, "total: {}", summary.totals)?;
    if summary.aborted {
        writeln!(stdout, "interrupted")?;
    }
    Ok(())
}

fn write_report(path: &Path, content: &str) -> anyhow::Result<()> {
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
