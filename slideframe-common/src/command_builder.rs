use std::path::PathBuf;
use std::process::Command;
use crate::error::ProcessError;

/// An argv template such as `["feh", "--bg-max", "{image}"]`. Placeholders
/// are substituted in every argument when the command is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuilder {
    template: Vec<String>,
}

impl CommandBuilder {
    pub fn new(template: Vec<String>) -> std::result::Result<Self, ProcessError> {
        match template.first() {
            Some(program) if !program.trim().is_empty() => Ok(Self { template }),
            _ => Err(ProcessError::EmptyCommand),
        }
    }

    pub fn program(&self) -> &str {
        &self.template[0]
    }

    pub fn template(&self) -> &[String] {
        &self.template
    }

    /// Expands the template into the argument list, without resolving the program.
    pub fn expand(&self, substitutions: &[(&str, &str)]) -> Vec<String> {
        self.template
            .iter()
            .map(|arg| {
                substitutions
                    .iter()
                    .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
            })
            .collect()
    }

    /// Builds a ready to run command, resolving the program through `PATH`.
    pub fn build(&self, substitutions: &[(&str, &str)]) -> std::result::Result<Command, ProcessError> {
        let args = self.expand(substitutions);
        let program = Self::resolve(&args[0])?;

        let mut cmd = Command::new(program);
        cmd.args(&args[1..]);
        Ok(cmd)
    }

    fn resolve(program: &str) -> std::result::Result<PathBuf, ProcessError> {
        which::which(program).map_err(|_| ProcessError::NotFound {
            program: program.to_string(),
        })
    }
}
