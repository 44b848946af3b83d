//! Test outcomes and the rules deriving them from a run.

use std::fmt;
use std::ops::AddAssign;
use std::time::Duration;

/// What a test is expected to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expectation {
    /// The test should succeed.
    Pass,
    /// A negative test: the engine should reject the input.
    Fail,
    /// A known failure: passing is welcome and not reported as unexpected.
    XFail,
    /// The test is not run.
    Skip,
}

/// What happened when the test ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Passed,
    Failed,
}

impl From<bool> for RunStatus {
    fn from(passed: bool) -> Self {
        if passed { Self::Passed } else { Self::Failed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    XFailed,
    UxPassed,
}

impl Outcome {
    /// Derives the outcome of a test from its expectation and its run, if it ran.
    pub fn classify(expected: Expectation, actual: Option<RunStatus>) -> Self {
        match (expected, actual) {
            (Expectation::Skip, _) | (_, None) => Self::Skipped,
            (Expectation::Pass | Expectation::XFail, Some(RunStatus::Passed)) => Self::Passed,
            (Expectation::Pass, Some(RunStatus::Failed)) => Self::Failed,
            (Expectation::Fail | Expectation::XFail, Some(RunStatus::Failed)) => Self::XFailed,
            (Expectation::Fail, Some(RunStatus::Passed)) => Self::UxPassed,
        }
    }

    /// Failed and unexpectedly passed tests make their suite fail.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::UxPassed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::XFailed => "xfailed",
            Self::UxPassed => "uxpassed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signal that terminated a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal(pub i32);

impl Signal {
    /// Detects signal termination from an exit code.
    ///
    /// Negative codes are reported by the process API, codes above 128 by shells.
    pub fn from_exit_code(exit_code: i32) -> Option<Self> {
        if exit_code < 0 {
            Some(Self(exit_code.saturating_abs()))
        } else if exit_code > 128 {
            Some(Self(exit_code - 128))
        } else {
            None
        }
    }

    pub fn number(self) -> i32 {
        self.0
    }

    pub fn name(self) -> String {
        let name = match self.0 {
            1 => "SIGHUP",
            2 => "SIGINT",
            3 => "SIGQUIT",
            4 => "SIGILL",
            5 => "SIGTRAP",
            6 => "SIGABRT",
            7 => "SIGBUS",
            8 => "SIGFPE",
            9 => "SIGKILL",
            10 => "SIGUSR1",
            11 => "SIGSEGV",
            12 => "SIGUSR2",
            13 => "SIGPIPE",
            14 => "SIGALRM",
            15 => "SIGTERM",
            24 => "SIGXCPU",
            25 => "SIGXFSZ",
            n => return format!("SIG{n}"),
        };
        name.into()
    }

    pub fn is_interrupt(self) -> bool {
        self.0 == 2
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// The result of one test execution.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub test: String,
    pub name: String,
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    /// Set when the engine was terminated by a signal.
    pub signal: Option<Signal>,
    pub timed_out: bool,
    pub interrupted: bool,
    /// The last lines the engine printed.
    pub output: String,
    pub elapsed: Duration,
    pub detail: String,
}

impl ExecutionRecord {
    pub fn skipped(
        test: impl Into<String>,
        name: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            test: test.into(),
            name: name.into(),
            outcome: Outcome::Skipped,
            exit_code: None,
            signal: None,
            timed_out: false,
            interrupted: false,
            output: String::new(),
            elapsed: Duration::ZERO,
            detail: detail.into(),
        }
    }

    /// A crash is a failure caused by signal termination, triaged separately from mismatches.
    pub fn is_crash(&self) -> bool {
        self.signal.is_some() && !self.interrupted
    }
}

/// Number of tests per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub xfailed: usize,
    pub uxpassed: usize,
}

impl Counts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::XFailed => self.xfailed += 1,
            Outcome::UxPassed => self.uxpassed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.xfailed + self.uxpassed
    }

    pub fn has_failures(&self) -> bool {
        self.failed + self.uxpassed > 0
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.xfailed += other.xfailed;
        self.uxpassed += other.uxpassed;
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tests: {} passed, {} failed, {} skipped, {} xfailed, {} uxpassed",
            self.total(),
            self.passed,
            self.failed,
            self.skipped,
            self.xfailed,
            self.uxpassed
        )
    }
}
