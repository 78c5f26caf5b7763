//! Shell-free process launcher.
//!
//! [`ProcessRunner::safe_spawn`] is the only place in the crate that creates
//! processes. An invocation moves through
//! `Created → Validating → Resolving → Spawned → Running` and ends in exactly
//! one of `Completed`, `TimedOut` or `SpawnFailed`. Only the validation step
//! can fail with an error; every operational failure is reported inside the
//! returned [`ExecutionResult`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, debug_span, warn};

use super::allowlist::CommandAllowlist;
use super::error::SecurityError;
use super::path_guard::SandboxRoot;
use super::which;

/// Default wall-clock limit for a single invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default cap for each of stdout and stderr.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Time between the graceful termination signal and the forced kill.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_TIMED_OUT: i32 = 124;
pub const EXIT_NOT_FOUND: i32 = 127;

/// Appended to stderr when the timeout fires.
pub const TIMEOUT_MARKER: &str = "\nProcess timed out";

const READ_CHUNK: usize = 8 * 1024;

/// Per-invocation options. Unset fields fall back to the runner's limits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Working directory. Defaults to the current directory.
    pub cwd: Option<PathBuf>,
    /// Variables overlaid on the inherited process environment.
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub max_output_bytes: Option<usize>,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = Some(bytes);
        self
    }
}

/// A single request to run an allowlisted tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub command: String,
    pub args: Vec<String>,
    pub options: SpawnOptions,
}

impl ExecutionRequest {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            options: SpawnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SpawnOptions) -> Self {
        self.options = options;
        self
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process ran and exited on its own.
    Completed,
    /// The process was terminated by the timeout.
    TimedOut,
    /// The executable was not found; nothing was spawned.
    NotFound,
    /// The working directory was missing; nothing was spawned.
    MissingWorkingDir,
    /// The OS refused to create the process.
    SpawnFailed,
}

/// Outcome of an invocation. Owned by the caller; the runner keeps nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Captured stdout, truncated to the output cap.
    pub stdout: Vec<u8>,
    /// Captured stderr, truncated to the output cap.
    pub stderr: Vec<u8>,
    pub termination: Termination,
}

impl ExecutionResult {
    fn not_spawned(termination: Termination, exit_code: i32, message: String) -> Self {
        Self {
            exit_code,
            stdout: Vec::new(),
            stderr: message.into_bytes(),
            termination,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.termination == Termination::Completed
    }

    pub fn timed_out(&self) -> bool {
        self.termination == Termination::TimedOut
    }

    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Defaults applied when [`SpawnOptions`] leaves a field unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerLimits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
    pub kill_grace: Duration,
}

impl Default for RunnerLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvocationState {
    Created,
    Validating,
    Resolving,
    Spawned,
    Running,
    Completed,
    TimedOut,
    SpawnFailed,
}

fn enter(state: InvocationState) {
    debug!(?state, "invocation state");
}

/// Validates, spawns and supervises allowlisted tools.
///
/// Cheap to clone; holds no per-invocation state, so one runner can serve
/// concurrent calls.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    allowlist: CommandAllowlist,
    limits: RunnerLimits,
    search_path: Option<OsString>,
    root: Option<SandboxRoot>,
    span: Span,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(CommandAllowlist::builtin())
    }
}

impl ProcessRunner {
    pub fn new(allowlist: CommandAllowlist) -> Self {
        Self {
            allowlist,
            limits: RunnerLimits::default(),
            search_path: None,
            root: None,
            span: debug_span!("process_runner"),
        }
    }

    pub fn with_limits(mut self, limits: RunnerLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Span that every invocation's events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Look executables up in `search_path` instead of the process `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Confine working directories to `root`. A relative `cwd` is taken
    /// from the root, and one that leaves it fails validation.
    pub fn with_root(mut self, root: SandboxRoot) -> Self {
        self.root = Some(root);
        self
    }

    pub fn root(&self) -> Option<&SandboxRoot> {
        self.root.as_ref()
    }

    pub fn allowlist(&self) -> &CommandAllowlist {
        &self.allowlist
    }

    pub fn limits(&self) -> RunnerLimits {
        self.limits
    }

    /// Resolve `command` on this runner's search path.
    pub fn resolve(&self, command: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(path) => which::which_in(command, Some(path)),
            None => which::which(command),
        }
    }

    /// `true` if `command` resolves to an executable.
    pub fn command_exists(&self, command: &str) -> bool {
        self.resolve(command).is_some()
    }

    pub async fn safe_spawn<S: AsRef<str>>(
        &self,
        command: &str,
        args: &[S],
        options: SpawnOptions,
    ) -> Result<ExecutionResult, SecurityError> {
        let request = ExecutionRequest {
            command: command.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
            options,
        };
        self.run(request).await
    }

    pub async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, SecurityError> {
        let span = debug_span!(parent: &self.span, "invocation", command = %request.command);
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: ExecutionRequest) -> Result<ExecutionResult, SecurityError> {
        let ExecutionRequest {
            command,
            args,
            options,
        } = request;
        enter(InvocationState::Created);

        enter(InvocationState::Validating);
        self.allowlist.validate(&command, &args)?;

        let cwd = match options.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let cwd = match &self.root {
            Some(root) => root.resolve(&cwd)?,
            None => cwd,
        };
        let timeout = options.timeout.unwrap_or(self.limits.timeout);
        let max_output = options
            .max_output_bytes
            .unwrap_or(self.limits.max_output_bytes);

        enter(InvocationState::Resolving);
        let Some(program) = self.resolve(&command) else {
            debug!("{} not found on search path", command);
            return Ok(ExecutionResult::not_spawned(
                Termination::NotFound,
                EXIT_NOT_FOUND,
                format!("Command not found: {}", command),
            ));
        };

        if !cwd.is_dir() {
            return Ok(ExecutionResult::not_spawned(
                Termination::MissingWorkingDir,
                EXIT_FAILURE,
                format!("Working directory does not exist: {}", cwd.display()),
            ));
        }

        debug!(cwd = %cwd.display(), "Executing: {} {}", command, args.join(" "));

        let mut child = match Command::new(&program)
            .args(&args)
            .current_dir(&cwd)
            .envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                enter(InvocationState::SpawnFailed);
                warn!("Failed to spawn {}: {}", program.display(), e);
                return Ok(ExecutionResult::not_spawned(
                    Termination::SpawnFailed,
                    EXIT_FAILURE,
                    e.to_string(),
                ));
            }
        };
        enter(InvocationState::Spawned);

        let stdout = CappedBuffer::new(max_output);
        let stderr = CappedBuffer::new(max_output);
        let stdout_reader = child.stdout.take().map(|s| spawn_reader(s, stdout.clone()));
        let stderr_reader = child.stderr.take().map(|s| spawn_reader(s, stderr.clone()));

        enter(InvocationState::Running);
        let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => (status, false),
            Err(_) => {
                warn!("{} exceeded timeout of {:?}", command, timeout);
                (self.terminate(&mut child).await, true)
            }
        };

        let drain = self.limits.kill_grace;
        finish_reader(stdout_reader, drain).await;
        finish_reader(stderr_reader, drain).await;
        let stdout = stdout.take();
        let mut stderr = stderr.take();

        if timed_out {
            enter(InvocationState::TimedOut);
            stderr.extend_from_slice(TIMEOUT_MARKER.as_bytes());
            return Ok(ExecutionResult {
                exit_code: EXIT_TIMED_OUT,
                stdout,
                stderr,
                termination: Termination::TimedOut,
            });
        }

        let exit_code = match status {
            Ok(status) => status.code().unwrap_or(EXIT_FAILURE),
            Err(e) => {
                warn!("Failed to wait for {}: {}", command, e);
                EXIT_FAILURE
            }
        };
        enter(InvocationState::Completed);
        debug!(exit_code, "{} finished", command);

        Ok(ExecutionResult {
            exit_code,
            stdout,
            stderr,
            termination: Termination::Completed,
        })
    }

    /// Graceful signal first, forced kill after the grace period.
    async fn terminate(&self, child: &mut Child) -> io::Result<ExitStatus> {
        request_termination(child);

        match tokio::time::timeout(self.limits.kill_grace, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    "Process ignored termination for {:?}, killing",
                    self.limits.kill_grace
                );
                child.kill().await?;
                child.wait().await
            }
        }
    }
}

/// Run a tool through a runner with the built-in allowlist.
pub async fn safe_spawn<S: AsRef<str>>(
    command: &str,
    args: &[S],
    options: SpawnOptions,
) -> Result<ExecutionResult, SecurityError> {
    ProcessRunner::default()
        .safe_spawn(command, args, options)
        .await
}

/// `true` if `command` is found on the process `PATH`.
pub fn command_exists(command: &str) -> bool {
    which::which(command).is_some()
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Some(id) = child.id()
        && let Err(e) = kill(Pid::from_raw(id as i32), Signal::SIGTERM)
    {
        debug!("SIGTERM failed: {}", e);
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("start_kill failed: {}", e);
    }
}

/// Output accumulator that silently drops bytes past its cap.
#[derive(Debug, Clone)]
struct CappedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    cap: usize,
}

impl CappedBuffer {
    fn new(cap: usize) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(Vec::new())),
            cap,
        }
    }

    fn push(&self, chunk: &[u8]) {
        let mut bytes = self.bytes.lock().unwrap_or_else(|p| p.into_inner());
        let room = self.cap.saturating_sub(bytes.len());
        let take = chunk.len().min(room);
        bytes.extend_from_slice(&chunk[..take]);
    }

    fn take(&self) -> Vec<u8> {
        let mut bytes = self.bytes.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *bytes)
    }
}

/// Keep reading until EOF even past the cap so the child never blocks on a
/// full pipe.
fn spawn_reader<R>(mut reader: R, sink: CappedBuffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => sink.push(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("output stream read failed: {}", e);
                    break;
                }
            }
        }
    })
}

/// Wait for a reader to hit EOF. A descendant that inherited the pipe can
/// keep it open after the child exits, so give up after `drain`.
async fn finish_reader(handle: Option<JoinHandle<()>>, drain: Duration) {
    let Some(mut handle) = handle else {
        return;
    };
    if tokio::time::timeout(drain, &mut handle).await.is_err() {
        warn!("Output stream still open {:?} after exit; truncating", drain);
        handle.abort();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sandbox::allowlist::AllowedCommand;
    use std::time::Instant;

    const TEST_TABLE: &[AllowedCommand] = &[
        AllowedCommand::any_args("ghost-tool"),
        AllowedCommand::any_args("printf"),
        AllowedCommand::any_args("sleep"),
        AllowedCommand::any_args("head"),
        AllowedCommand::any_args("false"),
        AllowedCommand::any_args("printenv"),
        AllowedCommand::any_args("pwd"),
        AllowedCommand::with_subcommands("git", &["status"]),
    ];

    fn runner() -> ProcessRunner {
        ProcessRunner::new(CommandAllowlist::new(TEST_TABLE))
    }

    #[tokio::test]
    async fn missing_binary_reports_127_without_spawning() {
        let empty = tempfile::tempdir().unwrap();
        let runner = runner().with_search_path(empty.path());

        let result = runner
            .safe_spawn::<&str>("ghost-tool", &[], SpawnOptions::new())
            .await
            .unwrap();

        assert_eq!(result.exit_code, EXIT_NOT_FOUND);
        assert_eq!(result.termination, Termination::NotFound);
        assert!(!result.success());
        assert!(result.stdout.is_empty());
        assert!(result.stderr_lossy().contains("Command not found: ghost-tool"));
    }

    #[tokio::test]
    async fn security_violations_are_errors() {
        let err = runner()
            .safe_spawn("rm", &["-rf", "/"], SpawnOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_command_not_allowed());

        let err = runner()
            .safe_spawn("git", &["push"], SpawnOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_command_not_allowed());

        let err = runner()
            .safe_spawn("printf", &["$(whoami)"], SpawnOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_dangerous_argument());
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_run() {
        let result = runner()
            .safe_spawn("printf", &["hello"], SpawnOptions::new())
            .await
            .unwrap();

        assert!(result.success(), "{result:?}");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout_lossy(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_value() {
        let result = runner()
            .safe_spawn::<&str>("false", &[], SpawnOptions::new())
            .await
            .unwrap();

        assert_eq!(result.termination, Termination::Completed);
        assert_ne!(result.exit_code, 0);
        assert!(!result.success());
    }

    #[tokio::test]
    async fn timeout_terminates_and_reports_124() {
        let start = Instant::now();
        let result = runner()
            .safe_spawn(
                "sleep",
                &["30"],
                SpawnOptions::new().timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap();

        assert_eq!(result.exit_code, EXIT_TIMED_OUT);
        assert!(result.timed_out());
        assert!(!result.success());
        assert!(result.stderr_lossy().ends_with("Process timed out"));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn output_is_capped_without_blocking_the_child() {
        let result = runner()
            .safe_spawn(
                "head",
                &["-c", "200000", "/dev/zero"],
                SpawnOptions::new().max_output_bytes(1000),
            )
            .await
            .unwrap();

        assert!(result.success(), "{result:?}");
        assert_eq!(result.stdout.len(), 1000);
    }

    #[tokio::test]
    async fn env_overrides_are_overlaid() {
        let result = runner()
            .safe_spawn(
                "printenv",
                &["VARAFORGE_RUNNER_TEST"],
                SpawnOptions::new().env("VARAFORGE_RUNNER_TEST", "overlay"),
            )
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout_lossy().trim(), "overlay");

        // PATH is still inherited.
        let result = runner()
            .safe_spawn("printenv", &["PATH"], SpawnOptions::new())
            .await
            .unwrap();
        assert!(result.success());
    }

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let result = runner()
            .safe_spawn::<&str>("pwd", &[], SpawnOptions::new().cwd(tmp.path()))
            .await
            .unwrap();

        let reported = PathBuf::from(result.stdout_lossy().trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn missing_working_directory_is_a_value() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");

        let result = runner()
            .safe_spawn("printf", &["x"], SpawnOptions::new().cwd(&missing))
            .await
            .unwrap();

        assert_eq!(result.exit_code, EXIT_FAILURE);
        assert_eq!(result.termination, Termination::MissingWorkingDir);
        assert!(result.stderr_lossy().contains("Working directory does not exist"));
    }

    #[tokio::test]
    async fn runner_limits_apply_when_options_are_unset() {
        let runner = runner().with_limits(RunnerLimits {
            timeout: Duration::from_millis(150),
            max_output_bytes: 16,
            kill_grace: Duration::from_secs(1),
        });

        let result = runner
            .safe_spawn("sleep", &["30"], SpawnOptions::new())
            .await
            .unwrap();
        assert!(result.timed_out());

        let result = runner
            .safe_spawn("head", &["-c", "4096", "/dev/zero"], SpawnOptions::new())
            .await
            .unwrap();
        assert_eq!(result.stdout.len(), 16);
    }

    #[tokio::test]
    async fn execution_request_round_trip_through_run() {
        let request = ExecutionRequest::new("printf", ["%s-%s", "a", "b"]);
        let result = runner().run(request).await.unwrap();
        assert_eq!(result.stdout_lossy(), "a-b");
    }

    #[test]
    fn command_exists_uses_search_path() {
        let empty = tempfile::tempdir().unwrap();
        let runner = runner().with_search_path(empty.path());
        assert!(!runner.command_exists("ghost-tool"));
        assert!(!command_exists("varaforge-definitely-missing-tool"));
    }

    fn write_script(dir: &std::path::Path, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn ignored_sigterm_escalates_to_kill_after_grace() {
        let bin = tempfile::tempdir().unwrap();
        write_script(bin.path(), "stubborn", "#!/bin/sh\ntrap '' TERM\nwhile :; do :; done\n");

        const TABLE: &[AllowedCommand] = &[AllowedCommand::any_args("stubborn")];
        let runner = ProcessRunner::new(CommandAllowlist::new(TABLE))
            .with_search_path(bin.path())
            .with_limits(RunnerLimits {
                timeout: Duration::from_millis(300),
                max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
                kill_grace: Duration::from_secs(1),
            });

        let start = Instant::now();
        let result = runner
            .safe_spawn::<&str>("stubborn", &[], SpawnOptions::new())
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(result.exit_code, EXIT_TIMED_OUT);
        assert_eq!(result.termination, Termination::TimedOut);
        assert!(result.stderr_lossy().ends_with("Process timed out"));
        assert!(elapsed >= Duration::from_millis(1300), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "{elapsed:?}");
    }

    #[tokio::test]
    async fn os_spawn_error_reports_exit_1() {
        let bin = tempfile::tempdir().unwrap();
        write_script(bin.path(), "broken", "#!/nonexistent/interpreter\n");

        const TABLE: &[AllowedCommand] = &[AllowedCommand::any_args("broken")];
        let runner =
            ProcessRunner::new(CommandAllowlist::new(TABLE)).with_search_path(bin.path());
        assert!(runner.command_exists("broken"));

        let result = runner
            .safe_spawn::<&str>("broken", &[], SpawnOptions::new())
            .await
            .unwrap();

        assert_eq!(result.exit_code, EXIT_FAILURE);
        assert_eq!(result.termination, Termination::SpawnFailed);
        assert!(!result.stderr.is_empty());
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn working_directory_must_stay_inside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(root.join("inner")).unwrap();
        let runner = runner().with_root(SandboxRoot::new(&root));

        let err = runner
            .safe_spawn::<&str>("pwd", &[], SpawnOptions::new().cwd(tmp.path()))
            .await
            .unwrap_err();
        assert!(err.is_path_violation());

        let err = runner
            .safe_spawn::<&str>("pwd", &[], SpawnOptions::new().cwd(root.join("../elsewhere")))
            .await
            .unwrap_err();
        assert!(err.is_path_violation());

        // The test process runs from the crate directory, outside the root.
        let err = runner
            .safe_spawn::<&str>("pwd", &[], SpawnOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_path_violation());
    }

    #[tokio::test]
    async fn relative_working_directory_is_taken_from_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("inner")).unwrap();
        let runner = runner().with_root(SandboxRoot::new(tmp.path()));

        let result = runner
            .safe_spawn::<&str>("pwd", &[], SpawnOptions::new().cwd("inner"))
            .await
            .unwrap();

        assert!(result.success(), "{result:?}");
        let reported = PathBuf::from(result.stdout_lossy().trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            tmp.path().join("inner").canonicalize().unwrap()
        );
    }

    #[test]
    fn capped_buffer_truncates() {
        let buf = CappedBuffer::new(5);
        buf.push(b"abc");
        buf.push(b"defg");
        buf.push(b"hij");
        assert_eq!(buf.take(), b"abcde");
    }
}
