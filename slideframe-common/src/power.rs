use crate::command_builder::CommandBuilder;
use crate::error::ProcessError;
use crate::executor::ProcessExecutor;

/// Outcome of a display power command. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerToggleReport {
    pub success: bool,
    pub diagnostic: String,
}

impl PowerToggleReport {
    pub fn ok(diagnostic: impl Into<String>) -> Self {
        Self {
            success: true,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Switches the physical output on or off.
pub trait PowerToggle: Send {
    fn set_display_power(&mut self, on: bool) -> PowerToggleReport;
}

/// Runs one external command per direction, `xrandr` by default.
#[derive(Debug, Clone)]
pub struct CommandPowerToggle {
    on_command: CommandBuilder,
    off_command: CommandBuilder,
    executor: ProcessExecutor,
}

impl CommandPowerToggle {
    pub fn new(on_command: CommandBuilder, off_command: CommandBuilder) -> Self {
        Self {
            on_command,
            off_command,
            executor: ProcessExecutor::new(),
        }
    }
}

impl PowerToggle for CommandPowerToggle {
    fn set_display_power(&mut self, on: bool) -> PowerToggleReport {
        let builder = if on { &self.on_command } else { &self.off_command };

        let result = builder
            .build(&[])
            .and_then(|cmd| self.executor.run(cmd));

        match result {
            Ok(output) => PowerToggleReport::ok(format!(
                "stdout={:?} stderr={:?}",
                output.stdout, output.stderr
            )),
            Err(ProcessError::NonZeroExit { code, stderr }) => {
                PowerToggleReport::failed(format!("exit code {}: {}", code, stderr))
            }
            Err(e) => PowerToggleReport::failed(e.to_string()),
        }
    }
}
