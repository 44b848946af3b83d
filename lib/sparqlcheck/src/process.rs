//! Subprocess invocation with a timeout and captured output.

use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Environment changes applied to a single child process.
///
/// The harness never mutates its own environment: a suite that needs its own
/// tools first on `PATH` threads an overlay into every invocation instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    path_prefix: Vec<PathBuf>,
    vars: BTreeMap<OsString, OsString>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory searched before the inherited `PATH`.
    ///
    /// Later calls are searched before earlier ones, the same way nested suites stack.
    #[must_use]
    pub fn with_path_prefix(mut self, dir: impl Into<PathBuf>) -> Self {
        self.path_prefix.insert(0, dir.into());
        self
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn path_prefix(&self) -> &[PathBuf] {
        &self.path_prefix
    }

    /// The `PATH` value the child sees, or `None` if it is inherited unchanged.
    pub fn path(&self) -> Option<OsString> {
        if self.path_prefix.is_empty() {
            return None;
        }
        let inherited = env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .path_prefix
            .iter()
            .cloned()
            .chain(env::split_paths(&inherited));
        env::join_paths(dirs).ok()
    }

    fn apply(&self, command: &mut Command) {
        if let Some(path) = self.path() {
            command.env("PATH", path);
        }
        for (key, value) in &self.vars {
            command.env(key, value);
        }
    }
}

/// One external program call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub env: EnvOverlay,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: EnvOverlay::default(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I: IntoIterator<Item = S>, S: Into<OsString>>(mut self, args: I) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, env: EnvOverlay) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What a finished (or killed) child left behind.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// The exit code, or minus the signal number if the child was killed by a signal.
    pub exit_code: i32,
    pub timed_out: bool,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out && !self.interrupted
    }

    /// The last `lines` lines of stderr followed by stdout.
    pub fn tail(&self, lines: usize) -> String {
        let all = self
            .stderr
            .lines()
            .chain(self.stdout.lines())
            .collect::<Vec<_>>();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The program does not exist or is not executable.
    #[error("{program}: command not found")]
    ToolNotFound { program: String },
    #[error("{program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Runs `invocation` to completion.
///
/// The child is killed when the timeout expires or when `interrupt` becomes set;
/// both cases are reported through flags on the output, not as errors.
pub fn run(
    invocation: &Invocation,
    interrupt: Option<&AtomicBool>,
) -> Result<ProcessOutput, RunError> {
    let program = invocation.program_name();
    let io_error = |source| RunError::Io {
        program: program.clone(),
        source,
    };
    let mut stdout_file = tempfile::tempfile().map_err(io_error)?;
    let mut stderr_file = tempfile::tempfile().map_err(io_error)?;

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file.try_clone().map_err(io_error)?))
        .stderr(Stdio::from(stderr_file.try_clone().map_err(io_error)?));
    if let Some(cwd) = &invocation.cwd {
        command.current_dir(cwd);
    }
    invocation.env.apply(&mut command);

    debug!(command = %invocation, "spawning");
    let started_at = Instant::now();
    let mut child = command.spawn().map_err(|error| {
        if matches!(
            error.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
        ) {
            RunError::ToolNotFound {
                program: program.clone(),
            }
        } else {
            io_error(error)
        }
    })?;

    let mut timed_out = false;
    let mut interrupted = false;
    let status = loop {
        if let Some(status) = child.try_wait().map_err(io_error)? {
            break status;
        }
        if interrupt.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            interrupted = true;
        } else if invocation
            .timeout
            .is_some_and(|timeout| started_at.elapsed() >= timeout)
        {
            timed_out = true;
        } else {
            thread::sleep(POLL_INTERVAL);
            continue;
        }
        // The child may exit on its own between the check and the kill
        let _ = child.kill();
        break child.wait().map_err(io_error)?;
    };
    let elapsed = started_at.elapsed();

    let output = ProcessOutput {
        stdout: read_back(&mut stdout_file).map_err(io_error)?,
        stderr: read_back(&mut stderr_file).map_err(io_error)?,
        exit_code: exit_code(status),
        timed_out,
        interrupted,
        elapsed,
    };
    debug!(
        command = %invocation,
        exit_code = output.exit_code,
        timed_out,
        interrupted,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "finished"
    );
    Ok(output)
}

fn read_back(file: &mut File) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Looks `program` up the way the child would, honoring the overlay `PATH`.
///
/// Programs given with a directory component are checked directly.
pub fn find_program(program: impl AsRef<OsStr>, env: &EnvOverlay) -> Option<PathBuf> {
    let program = Path::new(program.as_ref());
    if program.components().count() > 1 {
        return is_executable(program).then(|| program.to_owned());
    }
    let path = env.path().or_else(|| env::var_os("PATH"))?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
