//! Bounded-wait subprocess invocation.
//!
//! Every external command this tool runs goes through [`Invocation`], which
//! always captures output and always enforces a deadline. A blown deadline
//! is an [`Outcome`], not an error: callers decide whether it's fatal.

use crate::env::ExplicitEnv;
use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Path, PathBuf},
    process::ExitStatus,
    thread,
    time::{Duration, Instant},
};
use thiserror::Error;

static POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to spawn child process for command {command:?}: {source}")]
    SpawnFailed { command: String, source: io::Error },
    #[error("Failed to wait for child process for command {command:?} to exit: {source}")]
    WaitFailed { command: String, source: io::Error },
    #[error("Failed to kill command {command:?} after its deadline passed: {source}")]
    KillFailed { command: String, source: io::Error },
}

/// Everything a finished child process left behind. Output is decoded
/// lossily; `xcodebuild` and friends are well-behaved UTF-8 emitters, and a
/// stray byte shouldn't sink a whole build report.
#[derive(Debug)]
pub struct Captured {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl Captured {
    fn new(output: &std::process::Output) -> Self {
        Self {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn status(&self) -> ExitStatus {
        self.status
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn into_stdout(self) -> String {
        self.stdout
    }
}

/// What became of a bounded invocation.
#[derive(Debug)]
pub enum Outcome {
    Completed(Captured),
    TimedOut { timeout: Duration },
}

impl Outcome {
    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Build and run a single external command against a deadline.
#[derive(Debug)]
pub struct Invocation {
    name: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    env: Vec<(String, OsString)>,
    timeout: Duration,
}

impl Invocation {
    pub fn new(name: impl AsRef<OsStr>, timeout: Duration) -> Self {
        Self {
            name: name.as_ref().to_owned(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
            timeout,
        }
    }

    pub fn with_arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Self {
        for arg in args {
            self.args.push(arg.as_ref().to_owned());
        }
        self
    }

    pub fn with_current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    pub fn with_explicit_env(mut self, env: &impl ExplicitEnv) -> Self {
        for (key, value) in env.explicit_env() {
            self.env.push((key.to_owned(), value.to_owned()));
        }
        self
    }

    /// The command's string representation, for logs and error messages.
    pub fn display(&self) -> String {
        let mut display = self.name.to_string_lossy().into_owned();
        for arg in &self.args {
            display.push(' ');
            display.push_str(arg.to_string_lossy().as_ref());
        }
        display
    }

    /// Run the command, blocking until it exits or its deadline passes. The
    /// child is killed (and reaped) on deadline.
    pub fn run_and_capture(self) -> Result<Outcome, Error> {
        let display = self.display();
        log::debug!(
            "running command {:?} with a {:?} deadline",
            display,
            self.timeout
        );
        let mut expr = duct::cmd(self.name, self.args)
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        if let Some(dir) = &self.current_dir {
            expr = expr.dir(dir);
        }
        for (key, value) in &self.env {
            expr = expr.env(key, value);
        }
        let handle = expr.start().map_err(|source| Error::SpawnFailed {
            command: display.clone(),
            source,
        })?;
        let started = Instant::now();
        loop {
            match handle.try_wait() {
                Ok(Some(output)) => {
                    let captured = Captured::new(output);
                    log::debug!("command {:?} exited with {:?}", display, captured.status());
                    return Ok(Outcome::Completed(captured));
                }
                Ok(None) => {
                    if started.elapsed() >= self.timeout {
                        log::warn!(
                            "command {:?} passed its {:?} deadline; killing it",
                            display,
                            self.timeout
                        );
                        handle.kill().map_err(|source| Error::KillFailed {
                            command: display.clone(),
                            source,
                        })?;
                        return Ok(Outcome::TimedOut {
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    return Err(Error::WaitFailed {
                        command: display,
                        source,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spawn_failure_is_an_error() {
        let result =
            Invocation::new("definitely-not-a-real-tool", Duration::from_secs(1)).run_and_capture();
        assert!(matches!(result, Err(Error::SpawnFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_and_status() {
        let outcome = Invocation::new("echo", Duration::from_secs(5))
            .with_arg("hello")
            .run_and_capture()
            .unwrap();
        match outcome {
            Outcome::Completed(captured) => {
                assert!(captured.success());
                assert_eq!(captured.stdout().trim(), "hello");
            }
            Outcome::TimedOut { .. } => panic!("`echo` shouldn't time out"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn deadline_kills_the_child() {
        let outcome = Invocation::new("sleep", Duration::from_millis(200))
            .with_arg("5")
            .run_and_capture()
            .unwrap();
        assert!(outcome.timed_out());
    }
}
