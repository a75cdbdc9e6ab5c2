use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};

use crate::error::IpcError;
use crate::executor::session_runtime_dir;

const SOCKET_NAME: &str = "slideframe.sock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpcCommand {
    RotateNow,
    ToggleScheduleMode,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpcResponse {
    Success { message: String },
    Error { message: String },
    Status(StatusReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub playlist: String,
    /// `None` while a freshly selected playlist has not been shown yet.
    pub current_image: Option<String>,
    pub position: usize,
    pub total: usize,
    pub display_on: bool,
    pub override_schedule: bool,
}

/// `$XDG_RUNTIME_DIR/slideframe.sock`
pub fn default_socket_path() -> PathBuf {
    session_runtime_dir().join(SOCKET_NAME)
}

pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new() -> Self {
        Self::with_path(default_socket_path())
    }

    pub fn with_path(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn send_command(&self, command: IpcCommand) -> Result<IpcResponse, IpcError> {
        let mut stream = UnixStream::connect(&self.socket_path).map_err(|e| IpcError::Connection {
            path: self.socket_path.clone(),
            source: e,
        })?;

        let command_json = serde_json::to_string(&command).map_err(IpcError::InvalidMessage)?;

        stream
            .write_all(command_json.as_bytes())
            .map_err(IpcError::Transport)?;
        stream
            .shutdown(std::net::Shutdown::Write)
            .map_err(IpcError::Transport)?;

        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .map_err(IpcError::Transport)?;

        if response.is_empty() {
            return Err(IpcError::DaemonUnresponsive);
        }

        serde_json::from_str(&response).map_err(IpcError::InvalidMessage)
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Control socket of the daemon. One thread per connection, one command per
/// connection.
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl IpcServer {
    pub fn bind_default() -> Result<Self, IpcError> {
        Self::bind(default_socket_path())
    }

    /// Binds the socket, replacing a stale one left by a previous run.
    pub fn bind(socket_path: impl Into<PathBuf>) -> Result<Self, IpcError> {
        let socket_path = socket_path.into();
        let bind_error = |source| IpcError::Bind {
            path: socket_path.clone(),
            source,
        };

        if socket_path.exists() {
            std::fs::remove_file(&socket_path).map_err(bind_error)?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(bind_error)?;
        }

        let listener = UnixListener::bind(&socket_path).map_err(bind_error)?;

        log::info!("IPC server listening on {:?}", socket_path);

        Ok(Self {
            socket_path,
            listener,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accepts connections until the listener fails. Blocks the calling thread.
    pub fn serve<F>(self, handler: F)
    where
        F: Fn(IpcCommand) -> IpcResponse + Send + Clone + 'static,
    {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let handler = handler.clone();
                    std::thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(stream, &handler) {
                            log::error!("Error handling IPC connection: {}", e);
                        }
                    });
                }
                Err(e) => {
                    log::error!("Error accepting IPC connection: {}", e);
                }
            }
        }
    }

    fn handle_connection<F>(mut stream: UnixStream, handler: &F) -> Result<(), IpcError>
    where
        F: Fn(IpcCommand) -> IpcResponse,
    {
        let mut command_json = String::new();
        stream
            .read_to_string(&mut command_json)
            .map_err(IpcError::Transport)?;

        let response = match serde_json::from_str::<IpcCommand>(&command_json) {
            Ok(command) => {
                log::debug!("Received IPC command: {:?}", command);
                handler(command)
            }
            Err(e) => IpcResponse::Error {
                message: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response).map_err(IpcError::InvalidMessage)?;

        stream
            .write_all(response_json.as_bytes())
            .map_err(IpcError::Transport)?;

        Ok(())
    }
}
