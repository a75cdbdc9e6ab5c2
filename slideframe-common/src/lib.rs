pub mod play_order;
pub mod image_discovery;
pub mod sequencer;
pub mod schedule;
pub mod power;
pub mod render;
pub mod command_builder;
pub mod executor;
pub mod driver;
pub mod ipc;
pub mod error;

#[cfg(test)]
mod testing;

pub use play_order::{Advance, PlayOrder};
pub use image_discovery::{ImageDiscovery, ImageSource};
pub use sequencer::{PlaylistSequencer, Reconciliation, SequencerStatus};
pub use schedule::{
    Clock, DisplayPowerScheduler, LocalClock, OnWindow, PowerSchedule, PowerStatus, PowerTransition,
    Weekday, WeeklySchedule,
};
pub use power::{CommandPowerToggle, PowerToggle, PowerToggleReport};
pub use render::{CommandRenderer, Orientation, Renderer};
pub use command_builder::CommandBuilder;
pub use executor::{session_runtime_dir, CommandOutput, ProcessExecutor};
pub use driver::{CycleDriver, DriverSettings, StatusFeed, Trigger};
pub use ipc::{default_socket_path, IpcClient, IpcCommand, IpcResponse, IpcServer, StatusReport};
pub use error::{SlideframeError, ConfigError, Result, ErrorReporting};
