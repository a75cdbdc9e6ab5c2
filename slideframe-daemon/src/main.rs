use anyhow::{Context, Result};
use clap::Parser;
use slideframe_config::Config;
use slideframe_common::{
    CommandRenderer, CycleDriver, DisplayPowerScheduler, DriverSettings, ErrorReporting,
    ImageDiscovery, IpcCommand, IpcResponse, IpcServer, LocalClock, PlaylistSequencer, StatusFeed,
    Trigger,
};
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc::{self, error::TrySendError};

// Triggers are applied between ticks, so only a handful can be pending.
const TRIGGER_QUEUE_SIZE: usize = 16;

#[derive(Parser)]
#[command(name = "slideframe-daemon")]
#[command(about = "Picture frame slideshow daemon")]
#[command(version)]
struct Args {
    /// Configuration file (default: $XDG_CONFIG_HOME/slideframe/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    log::info!("Starting slideframe daemon...");

    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .map_err(|e| {
        e.log_error("Configuration error");
        anyhow::anyhow!("Configuration error: {}", e.user_friendly_message())
    })?;

    log_settings(&config);

    let driver = build_driver(&config).map_err(|e| {
        e.log_error("Failed to start slideshow");
        anyhow::anyhow!("{}", e.user_friendly_message())
    })?;

    let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE_SIZE);

    let server = IpcServer::bind_default().context("Failed to start control socket")?;
    let socket_path = server.socket_path().to_path_buf();
    let power_enabled = config.power.enabled;
    let status = driver.status_feed();

    std::thread::spawn(move || {
        server.serve(move |command| {
            handle_ipc_command(command, &trigger_tx, &status, power_enabled)
        });
    });

    let result = driver.run(trigger_rx, shutdown_signal()).await;

    if let Err(e) = std::fs::remove_file(&socket_path) {
        log::debug!("Failed to remove control socket {:?}: {}", socket_path, e);
    }

    match result {
        Ok(()) => {
            log::info!("slideframe daemon stopped");
            Ok(())
        }
        Err(e) => {
            e.log_error("Slideshow stopped");
            Err(anyhow::anyhow!("{}", e.user_friendly_message()))
        }
    }
}

fn build_driver(config: &Config) -> slideframe_common::Result<CycleDriver> {
    let source = ImageDiscovery::new(config.playlists_dir.clone());
    let sequencer = PlaylistSequencer::new(
        Box::new(source),
        config.initial_playlist.as_deref(),
        config.rotation_interval,
    )?;

    let mut scheduler = DisplayPowerScheduler::new(
        config.power.schedule(),
        Box::new(config.power.power_toggle()?),
        config.power.retry_interval,
    );
    if config.power.enabled {
        scheduler.power_on_at_startup();
    }

    let renderer = CommandRenderer::new(config.renderer_command()?, config.orientation);

    Ok(CycleDriver::new(
        sequencer,
        scheduler,
        Box::new(renderer),
        Box::new(LocalClock),
        DriverSettings {
            cycle_interval: config.cycle_interval,
            manage_power: config.power.enabled,
        },
    ))
}

fn log_settings(config: &Config) {
    log::info!("Settings:");
    log::info!("  playlists: {:?}", config.playlists_dir);
    log::info!(
        "  initial playlist: {}",
        config.initial_playlist.as_deref().unwrap_or("(random)")
    );
    log::info!(
        "  cycle interval: {}",
        humantime::format_duration(config.cycle_interval)
    );
    log::info!(
        "  rotation interval: {}",
        humantime::format_duration(config.rotation_interval)
    );
    log::info!("  orientation: {}", config.orientation);
    log::info!("  renderer: {:?}", config.renderer.command);

    if config.power.enabled {
        let schedule = config.power.schedule();
        log::info!(
            "  power schedule: {}, retry every {}",
            if schedule.uses_override() { "override window" } else { "weekly" },
            humantime::format_duration(config.power.retry_interval)
        );
    } else {
        log::info!("  power management: disabled");
    }
}

// Runs on the IPC server threads. Commands go through the trigger queue and
// are applied between ticks; status is read from the published snapshot so it
// answers even while a tick waits for the display window.
fn handle_ipc_command(
    command: IpcCommand,
    triggers: &mpsc::Sender<Trigger>,
    status: &StatusFeed,
    power_enabled: bool,
) -> IpcResponse {
    match command {
        IpcCommand::RotateNow => match enqueue(triggers, Trigger::RotateNow) {
            Ok(()) => IpcResponse::Success {
                message: "Rotating to another playlist".to_string(),
            },
            Err(response) => response,
        },

        IpcCommand::ToggleScheduleMode => {
            if !power_enabled {
                return IpcResponse::Error {
                    message: "Power management is disabled".to_string(),
                };
            }
            let current = if status.snapshot().override_schedule {
                "override window"
            } else {
                "weekly schedule"
            };
            match enqueue(triggers, Trigger::ToggleScheduleMode) {
                Ok(()) => IpcResponse::Success {
                    message: format!("Switching schedule mode (currently using the {})", current),
                },
                Err(response) => response,
            }
        }

        IpcCommand::Status => IpcResponse::Status(status.snapshot()),
    }
}

fn enqueue(triggers: &mpsc::Sender<Trigger>, trigger: Trigger) -> Result<(), IpcResponse> {
    triggers.try_send(trigger).map_err(|e| match e {
        TrySendError::Full(_) => IpcResponse::Error {
            message: "Too many pending requests, try again later".to_string(),
        },
        TrySendError::Closed(_) => IpcResponse::Error {
            message: "Daemon is shutting down".to_string(),
        },
    })
}

async fn shutdown_signal() {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                log::error!("Failed to listen for Ctrl-C: {}", e);
            }
        }
        _ = terminate => {}
    }
}
