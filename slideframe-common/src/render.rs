use std::fmt;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::command_builder::CommandBuilder;
use crate::error::RenderError;
use crate::executor::ProcessExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Clockwise rotation the viewer applies so images appear upright.
    pub fn rotation_degrees(self) -> u32 {
        match self {
            Orientation::Portrait => 90,
            Orientation::Landscape => 0,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

/// Decodes, scales and displays one image.
pub trait Renderer: Send {
    fn render(&mut self, image: &Path) -> Result<(), RenderError>;
}

/// Hands each image to an external viewer command. `{image}` is replaced by
/// the image path and `{rotation}` by the orientation rotation in degrees.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: CommandBuilder,
    orientation: Orientation,
    executor: ProcessExecutor,
}

impl CommandRenderer {
    pub fn new(command: CommandBuilder, orientation: Orientation) -> Self {
        Self {
            command,
            orientation,
            executor: ProcessExecutor::new(),
        }
    }
}

impl Renderer for CommandRenderer {
    fn render(&mut self, image: &Path) -> Result<(), RenderError> {
        if !image.is_file() {
            return Err(RenderError::Missing {
                path: image.to_path_buf(),
            });
        }

        let image_arg = image.to_string_lossy();
        let rotation = self.orientation.rotation_degrees().to_string();
        let cmd = self
            .command
            .build(&[("{image}", image_arg.as_ref()), ("{rotation}", rotation.as_str())])
            .map_err(|e| RenderError::Process {
                path: image.to_path_buf(),
                source: e,
            })?;

        self.executor.run(cmd).map_err(|e| RenderError::Process {
            path: image.to_path_buf(),
            source: e,
        })?;

        log::info!("Showing {:?}", image);
        Ok(())
    }
}
