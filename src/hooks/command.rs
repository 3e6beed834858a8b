//! External command hooks.
//!
//! Templates reference `$TOOL_NAME`, `$TOOL_INPUT` and `$TOOL_RESULT`. The
//! values are exported into the child's environment and expanded by `sh`,
//! so tool text is never spliced into the command line itself.

use std::time::Duration;

use tracing::debug;

use super::HookContext;
use crate::error::{Result, TetherError};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `template` through `sh -c`. A non-zero exit status is an error.
pub async fn run_command(template: &str, ctx: &HookContext) -> Result<()> {
    let child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(template)
        .env("TOOL_NAME", &ctx.tool_name)
        .env("TOOL_INPUT", ctx.tool_input.as_deref().unwrap_or_default())
        .env("TOOL_RESULT", ctx.result.as_deref().unwrap_or_default())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(COMMAND_TIMEOUT, child)
        .await
        .map_err(|_| {
            TetherError::tool(
                "hook",
                format!("command timed out after {}s", COMMAND_TIMEOUT.as_secs()),
            )
        })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TetherError::tool(
            "hook",
            format!(
                "command exited with {}: {}",
                output.status.code().map_or("signal".to_string(), |code| code.to_string()),
                stderr.trim()
            ),
        ));
    }

    debug!(
        stdout = %String::from_utf8_lossy(&output.stdout).trim(),
        "hook command finished"
    );
    Ok(())
}
