//! External tool execution

use crate::error::HostError;
use tokio::process::Command;
use tracing::debug;

/// Runs `program` with `args` and returns its stdout.
///
/// The child is killed if the returned future is dropped, so callers can bound
/// slow tools (firmware reset, NV query) with `tokio::time::timeout`.
pub(crate) async fn run(program: &str, args: &[&str]) -> Result<String, HostError> {
    let command_line = format!("{} {}", program, args.join(" "));
    debug!("Running {}", command_line);

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| HostError::CommandSpawn {
            command: command_line.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(HostError::CommandFailed {
            command: command_line,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
