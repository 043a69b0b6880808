use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, MediaRpcError};
use crate::media::Invocation;

/// Captured result of one external process run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl ProcessOutput {
    pub fn succeeded<S: Into<String>>(stderr: S) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(0),
            success: true,
            ..Default::default()
        }
    }

    pub fn failed<S: Into<String>>(code: i32, stderr: S) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(code),
            success: false,
            ..Default::default()
        }
    }
}

/// Runs external executables.
///
/// A nonzero exit is a normal outcome (`success == false`); only a failure to
/// start the process is an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        debug!("Executing {}: {}", invocation.description, invocation.command_line());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| MediaRpcError::Spawn {
            program: invocation.program.clone(),
            source: e,
        })?;

        // wait_with_output drains stdout and stderr concurrently
        let output = child.wait_with_output().await?;

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            success: output.status.success(),
        };
        debug!(
            "{} exited with {:?} ({} bytes stderr)",
            invocation.description,
            result.exit_code,
            result.stderr.len()
        );
        Ok(result)
    }
}

/// Report whether a tool starts and answers its version/help flag.
/// Returns the first line of its output.
pub async fn check_tool(runner: &dyn ProcessRunner, program: &str, flag: &str) -> Result<String> {
    let invocation = Invocation::new(program, format!("{} availability check", program)).arg(flag);
    let output = runner.run(&invocation).await?;

    if output.success {
        let text = if output.stdout.trim().is_empty() { &output.stderr } else { &output.stdout };
        Ok(text.lines().next().unwrap_or("available").trim().to_string())
    } else {
        Err(MediaRpcError::Config(format!(
            "{} {} exited with {:?}: {}",
            program,
            flag,
            output.exit_code,
            output.stderr.trim()
        )))
    }
}
