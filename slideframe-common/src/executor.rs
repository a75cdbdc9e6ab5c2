use std::path::PathBuf;
use std::process::Command;
use crate::error::ProcessError;

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Runs the command to completion. A non-zero exit becomes
    /// `ProcessError::NonZeroExit` carrying stderr.
    pub fn run(&self, mut cmd: Command) -> std::result::Result<CommandOutput, ProcessError> {
        Self::apply_session_env(&mut cmd);

        log::debug!("Executing command: {:?}", cmd);

        let output = cmd.output()
            .map_err(|e| ProcessError::Execution {
                command: format!("{:?}", cmd),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            log::debug!("Command {:?} failed with exit code {}: {}", cmd, code, stderr);

            if !stdout.is_empty() {
                log::debug!("stdout: {}", stdout);
            }

            return Err(ProcessError::NonZeroExit { code, stderr });
        }

        if !stdout.is_empty() {
            log::debug!("stdout: {}", stdout);
        }

        Ok(CommandOutput { stdout, stderr })
    }

    // The frame is usually started from a service without a desktop
    // session, so fill in what X11 tools need to find the display.
    fn apply_session_env(cmd: &mut Command) {
        if std::env::var_os("DISPLAY").is_none() {
            cmd.env("DISPLAY", ":0");
        }

        if std::env::var_os("XDG_RUNTIME_DIR").is_none() {
            cmd.env("XDG_RUNTIME_DIR", session_runtime_dir());
        }
    }
}

/// `$XDG_RUNTIME_DIR`, falling back to `/run/user/<uid>` and then `/tmp`.
pub fn session_runtime_dir() -> PathBuf {
    if let Some(dir) = dirs::runtime_dir() {
        return dir;
    }

    let uid = rustix::process::getuid().as_raw();
    let fallback = PathBuf::from(format!("/run/user/{}", uid));
    if fallback.is_dir() {
        fallback
    } else {
        PathBuf::from("/tmp")
    }
}
