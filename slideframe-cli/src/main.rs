use clap::{Parser, Subcommand};
use slideframe_common::{ErrorReporting, IpcClient, IpcCommand, IpcResponse, SlideframeError};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slideframe-cli")]
#[command(about = "slideframe-cli (picture frame slideshow control)")]
#[command(version)]
struct Cli {
    /// Control socket of the daemon (default: $XDG_RUNTIME_DIR/slideframe.sock)
    #[arg(long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch to another playlist right away
    RotateNow,

    /// Switch between the weekly power schedule and the override window
    ToggleScheduleMode,

    /// Show current status
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let client = match cli.socket {
        Some(path) => IpcClient::with_path(path),
        None => IpcClient::new(),
    };

    let command = match cli.command {
        Commands::RotateNow => IpcCommand::RotateNow,
        Commands::ToggleScheduleMode => IpcCommand::ToggleScheduleMode,
        Commands::Status => IpcCommand::Status,
    };

    match client.send_command(command) {
        Ok(response) => print_response(response),
        Err(e) => {
            let error = SlideframeError::from(e);
            eprintln!("Error: {}", error.user_friendly_message());
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_response(response: IpcResponse) {
    match response {
        IpcResponse::Success { message } => {
            println!("✓ {}", message);
        }

        IpcResponse::Error { message } => {
            eprintln!("✗ Error: {}", message);
            std::process::exit(1);
        }

        IpcResponse::Status(report) => {
            println!("slideframe Status:");
            println!("==================");
            println!("Playlist: {}", report.playlist);
            match &report.current_image {
                Some(image) => println!(
                    "Image:    {} ({}/{})",
                    image,
                    report.position + 1,
                    report.total
                ),
                None => println!("Image:    (pending)"),
            }
            println!("Display:  {}", if report.display_on { "ON" } else { "OFF" });
            println!(
                "Schedule: {}",
                if report.override_schedule { "override window" } else { "weekly" }
            );
        }
    }
}
