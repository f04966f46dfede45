//! Running local commands and scripts as child processes.
//!
//! Children never go through a shell. String commands are split with
//! POSIX shell quoting rules and the first word is executed directly.
use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Path, PathBuf},
    time::Duration,
};

use snafu::prelude::*;
use tokio::process::Command;

use crate::{
    InvalidRequestSnafu, ResourceNotFoundSnafu, Result, SpawnSnafu, TimeoutSnafu, WaitSnafu,
};


/// Exit code reported for a child that was ended by a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// How to run a child process.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunConfig {
    /// The complete environment of the child. Nothing is inherited from the
    /// current process, not even `PATH`.
    pub environment: HashMap<String, String>,
    /// Kill the child and fail if it runs for longer than this.
    pub timeout: Option<Duration>,
    pub work_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
}

/// Splits `command` into words and runs it, returning the exit code.
pub async fn run_command(command: &str, config: &RunConfig) -> Result<i32> {
    let words = shlex::split(command).context(InvalidRequestSnafu {
        msg: format!("could not split command '{command}', check its quoting"),
    })?;
    run_args(&words, config).await
}

/// Runs `args[0]` with the remaining words as arguments, returning the exit
/// code.
pub async fn run_args<S: AsRef<OsStr>>(args: &[S], config: &RunConfig) -> Result<i32> {
    let (program, rest) = args.split_first().context(InvalidRequestSnafu {
        msg: "empty command",
    })?;
    let name = program.as_ref().to_string_lossy().into_owned();

    let mut cmd = Command::new(program);
    cmd.args(rest)
        .env_clear()
        .envs(&config.environment)
        .kill_on_drop(true);
    if let Some(dir) = &config.work_dir {
        cmd.current_dir(dir);
    }

    log::debug!("running '{name}' with {} argument(s)", rest.len());
    let mut child = cmd.spawn().context(SpawnSnafu { program: &name })?;

    let status = match config.timeout {
        None => child.wait().await.context(WaitSnafu { program: &name })?,
        Some(after) => {
            let waited = tokio::time::timeout(after, child.wait()).await;
            match waited {
                Ok(status) => status.context(WaitSnafu { program: &name })?,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        log::warn!("could not kill '{name}' after timeout: {e}");
                    }
                    return TimeoutSnafu {
                        program: name,
                        after,
                    }
                    .fail();
                }
            }
        }
    };

    let code = status.code().unwrap_or(SIGNALED_EXIT_CODE);
    log::debug!("'{name}' exited with {code}");
    Ok(code)
}

/// Runs the executable script at `path` without arguments, returning the
/// exit code.
pub async fn run_script(path: impl AsRef<Path>, config: &RunConfig) -> Result<i32> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "script not found or inaccessible",
        ))
        .context(ResourceNotFoundSnafu { path });
    }
    run_args(&[path], config).await
}
