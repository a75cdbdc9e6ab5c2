use std::path::PathBuf;
use thiserror::Error;

/// Main error type for slideframe operations
#[derive(Error, Debug)]
pub enum SlideframeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Image discovery error: {0}")]
    ImageDiscovery(#[from] ImageDiscoveryError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Process execution error: {0}")]
    Process(#[from] ProcessError),

    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),
}

impl SlideframeError {
    /// Fatal errors stop the tick loop; everything else is logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SlideframeError::Config(_))
    }
}

/// Configuration-related errors. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path:?}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse TOML configuration: {message}")]
    TomlParse { message: String },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No playlists found in {path:?}")]
    NoPlaylists { path: PathBuf },

    #[error("Playlist '{name}' does not exist")]
    UnknownPlaylist { name: String },

    #[error("Playlist '{name}' contains no images")]
    EmptyPlaylist { name: String },
}

/// Filesystem listing errors
#[derive(Error, Debug)]
pub enum ImageDiscoveryError {
    #[error("Failed to read directory: {path:?}")]
    DirectoryRead { path: PathBuf, source: std::io::Error },
}

/// Errors reported by the renderer. The cycle logs them and moves on.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Image no longer exists: {path:?}")]
    Missing { path: PathBuf },

    #[error("Viewer command failed for {path:?}: {source}")]
    Process { path: PathBuf, source: ProcessError },
}

/// Process execution errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Program not found in PATH: {program}")]
    NotFound { program: String },

    #[error("Command execution failed: {command:?}")]
    Execution { command: String, source: std::io::Error },

    #[error("Command returned non-zero exit code: {code}")]
    NonZeroExit { code: i32, stderr: String },
}

/// IPC communication errors
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Failed to bind control socket {path:?}")]
    Bind { path: PathBuf, source: std::io::Error },

    #[error("Failed to connect to daemon at {path:?}")]
    Connection { path: PathBuf, source: std::io::Error },

    #[error("Failed to exchange message with the daemon")]
    Transport(#[source] std::io::Error),

    #[error("Invalid IPC message format")]
    InvalidMessage(#[source] serde_json::Error),

    #[error("Daemon not responding")]
    DaemonUnresponsive,
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, SlideframeError>;

// Error reporting utilities
pub trait ErrorReporting {
    fn log_error(&self, context: &str);
    fn user_friendly_message(&self) -> String;
}

impl ErrorReporting for SlideframeError {
    fn log_error(&self, context: &str) {
        log::error!("{}: {}", context, self.user_friendly_message());
    }

    fn user_friendly_message(&self) -> String {
        match self {
            SlideframeError::Config(ConfigError::FileRead { path, .. }) => {
                format!("Configuration file not found: {:?}", path)
            }
            SlideframeError::Config(ConfigError::TomlParse { message }) => {
                format!("Invalid configuration format: {}", message)
            }
            SlideframeError::Config(ConfigError::NoPlaylists { path }) => {
                format!("No playlist directories found in {:?}", path)
            }
            SlideframeError::Config(ConfigError::EmptyPlaylist { name }) => {
                format!("Playlist '{}' has no images left to show", name)
            }
            SlideframeError::Render(RenderError::Missing { path }) => {
                format!("Image disappeared before it could be shown: {:?}", path)
            }
            SlideframeError::Ipc(IpcError::Connection { path, .. }) => {
                format!("slideframe daemon is not running (no socket at {:?})", path)
            }
            SlideframeError::Ipc(IpcError::DaemonUnresponsive) => {
                "slideframe daemon is not responding. Please restart the daemon.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
