//! [`DepotConnector`] that runs the depot command-line tool per command.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use locsync_core::{
    CommandOutput, ConnectionSettings, DepotClient, DepotCommand, DepotConnector, DepotError,
    EnvSource, Severity,
};

use crate::output::{is_connection_failure, parse_script_output, parse_tagged_output};

/// Default depot tool looked up on `PATH`.
pub const DEFAULT_PROGRAM: &str = "sd";
/// Overrides the depot tool.
pub const PROGRAM_ENV: &str = "LOCSYNC_DEPOT";
/// Optional per-command timeout in whole seconds.
pub const TIMEOUT_ENV: &str = "LOCSYNC_COMMAND_TIMEOUT_SECS";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Spawns `<program> [base args] [-p port] [-c client] [-u user] <mode> <command>`.
#[derive(Debug, Clone)]
pub struct ProcessConnector {
    program: OsString,
    base_args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl Default for ProcessConnector {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl ProcessConnector {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout: None,
        }
    }

    /// Arguments placed before everything else, e.g. a script path when the
    /// program is an interpreter.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kills a command still running after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `LOCSYNC_DEPOT` and `LOCSYNC_COMMAND_TIMEOUT_SECS`.
    ///
    /// A timeout that is not a positive integer is ignored.
    pub fn from_env(env: &impl EnvSource) -> Self {
        let program = env
            .var(PROGRAM_ENV)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());
        let timeout = env
            .var(TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Self::new(program).with_timeout(timeout)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl DepotConnector for ProcessConnector {
    type Client = ProcessClient;

    fn connect(&self, settings: &ConnectionSettings) -> Result<ProcessClient, DepotError> {
        let mut global_args = self.base_args.clone();
        for (flag, value) in [
            ("-p", &settings.port),
            ("-c", &settings.client),
            ("-u", &settings.user),
        ] {
            if let Some(value) = value {
                global_args.push(flag.into());
                global_args.push(value.into());
            }
        }
        let env: Vec<(String, String)> = settings
            .passthrough_entries()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        tracing::debug!(
            program = %PathBuf::from(&self.program).display(),
            port = settings.port.as_deref().unwrap_or("-"),
            client = settings.client.as_deref().unwrap_or("-"),
            extra_settings = env.len(),
            "depot client ready"
        );
        Ok(ProcessClient {
            program: self.program.clone(),
            global_args,
            env,
            timeout: self.timeout,
        })
    }
}

/// One depot "connection": the tool plus resolved global options.
#[derive(Debug)]
pub struct ProcessClient {
    program: OsString,
    global_args: Vec<OsString>,
    /// Remaining `SD*` ini settings, exported to the tool's environment.
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

struct Captured {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl ProcessClient {
    fn spawn(&self, command: &DepotCommand) -> Result<Child, DepotError> {
        let mode = if command.tagged { "-ztag" } else { "-s" };
        Command::new(&self.program)
            .args(&self.global_args)
            .arg(mode)
            .arg(&command.name)
            .args(&command.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| DepotError::Connection {
                message: format!(
                    "cannot start {}: {err}",
                    PathBuf::from(&self.program).display()
                ),
            })
    }

    fn capture(&self, command: &DepotCommand, mut child: Child) -> Result<Captured, DepotError> {
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.timeout {
            None => child.wait().map_err(|e| self.io_err(e))?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    if let Some(status) = child.try_wait().map_err(|e| self.io_err(e))? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        tracing::warn!(%command, secs = limit.as_secs(), "depot command timed out");
                        return Err(DepotError::Timeout {
                            command: command.to_string(),
                            after: limit,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        Ok(Captured {
            status,
            stdout: join_drain(stdout),
            stderr: join_drain(stderr),
        })
    }

    fn io_err(&self, source: std::io::Error) -> DepotError {
        DepotError::Io {
            path: PathBuf::from(&self.program),
            source,
        }
    }
}

impl DepotClient for ProcessClient {
    fn run(&mut self, command: &DepotCommand) -> Result<CommandOutput, DepotError> {
        tracing::debug!(%command, "running depot command");
        let child = self.spawn(command)?;
        let captured = self.capture(command, child)?;
        let stderr_lines: Vec<String> = captured
            .stderr
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|l| !l.is_empty())
            .collect();

        if command.tagged {
            let mut output = parse_tagged_output(&captured.stdout);
            if !captured.status.success() {
                return Err(failure(command, stderr_lines));
            }
            if !stderr_lines.is_empty() {
                output.severity = Severity::Warning;
                output.messages.extend(stderr_lines);
            }
            return Ok(output);
        }

        let parsed = parse_script_output(&captured.stdout);
        if parsed.failed() || !captured.status.success() {
            let mut messages = parsed.errors;
            messages.extend(stderr_lines);
            return Err(failure(command, messages));
        }
        Ok(parsed.output)
    }
}

fn failure(command: &DepotCommand, messages: Vec<String>) -> DepotError {
    if messages.iter().any(|m| is_connection_failure(m)) {
        DepotError::Connection {
            message: messages.join("; "),
        }
    } else {
        DepotError::Command {
            command: command.to_string(),
            messages,
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_drain(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
