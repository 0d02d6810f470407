//! External tool invocation.
//!
//! Every packaging tool (makensis, hdiutil, codesign, SetFile, strip, ...)
//! is run to completion before the next step starts. Success is decided
//! by exit status alone.

use crate::bundler::error::{Error, Result};
use std::ffi::OsStr;
use std::process::Output;

/// Runs `program` with `args`, failing on a non-zero exit status.
///
/// Returns the captured output so callers can parse stdout.
pub async fn run_command<S, I, A>(program: S, args: I) -> Result<Output>
where
    S: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let program = program.as_ref();
    let command = program.to_string_lossy().into_owned();
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();

    log::debug!(
        "Running {} {}",
        command,
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = tokio::process::Command::new(program)
        .args(&args)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: command.clone(),
            error,
        })?;

    if !output.status.success() {
        return Err(Error::CommandStatus {
            command,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

/// Blocking [`run_command`], for tool calls made while files are still
/// being collected.
pub fn run_command_blocking<S, I, A>(program: S, args: I) -> Result<Output>
where
    S: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let program = program.as_ref();
    let command = program.to_string_lossy().into_owned();
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    log::debug!("Running {command} with {} arguments", args.len());

    let output = std::process::Command::new(program)
        .args(&args)
        .output()
        .map_err(|error| Error::CommandFailed {
            command: command.clone(),
            error,
        })?;
    if !output.status.success() {
        return Err(Error::CommandStatus {
            command,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Like [`run_command`] but only logs a failure.
///
/// For cosmetic steps whose failure must not abort packaging.
pub async fn run_command_lenient<S, I, A>(program: S, args: I) -> bool
where
    S: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    match run_command(program, args).await {
        Ok(_) => true,
        Err(e) => {
            log::warn!("{e}");
            false
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nonzero_exit_is_reported_with_code() {
        let err = run_command("sh", ["-c", "echo boom >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            Error::CommandStatus { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let err = run_command("definitely-not-a-real-tool-xyz", ["--version"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[test]
    fn blocking_variant_reports_status_too() {
        let err = run_command_blocking("sh", ["-c", "exit 2"]).unwrap_err();
        assert!(matches!(err, Error::CommandStatus { code: Some(2), .. }));
        assert!(run_command_blocking("true", std::iter::empty::<&str>()).is_ok());
    }

    #[tokio::test]
    async fn stdout_is_captured() {
        let out = run_command("echo", ["hello"]).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }
}
