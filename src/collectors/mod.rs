pub mod checks;
pub mod network;
pub mod sessions;
pub mod system;
pub mod tls;
pub mod weather;

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} timed out")]
    Timeout(String),
    #[error("{program} exited with status {code:?}")]
    Exit { program: String, code: Option<i32> },
    #[error("unexpected output: {0}")]
    Parse(String),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tls: {0}")]
    Tls(String),
}

/// Output of an external command that ran to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
}

/// Runs `program` with a hard timeout. The child is killed when the timeout
/// fires or the calling task is cancelled.
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, CollectError> {
    let child = Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = time::timeout(timeout, child)
        .await
        .map_err(|_| CollectError::Timeout(program.to_string()))??;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    })
}

/// Like [`run_command`] but treats any non-zero exit as a failure.
pub async fn run_checked(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, CollectError> {
    let out = run_command(program, args, timeout).await?;
    if out.code != Some(0) {
        return Err(CollectError::Exit {
            program: program.to_string(),
            code: out.code,
        });
    }
    Ok(out.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let err = run_command(
            "motdstat-definitely-not-a-binary",
            &[],
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CollectError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_program_times_out() {
        let err = run_command("sleep", &["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Timeout(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_rejected_by_run_checked() {
        let err = run_checked("false", &[], Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Exit { .. }));
    }
}
