//! appmgr — application manager client CLI.
//!
//! # Usage
//!
//! ```text
//! appmgr launch <app[:N]> [args...]
//! appmgr send <app[:N]> [args...]
//! appmgr stop <app[:N]>
//! appmgr power-off
//! appmgr listen <name> [--multi] [--priority <n>]
//! appmgr apps [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    apps::AppsArgs, launch::LaunchArgs, listen::ListenArgs, power::PowerOffArgs,
    send::{SendArgs, StopArgs},
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "appmgr",
    version,
    about = "Talk to the application manager over the message bus",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an application, or restore it if already running.
    Launch(LaunchArgs),

    /// Send a message to a running application instance.
    Send(SendArgs),

    /// Ask a running application instance to stop.
    Stop(StopArgs),

    /// Set the shutdown flag and stop every application.
    PowerOff(PowerOffArgs),

    /// Register as an application and print the signals it receives.
    Listen(ListenArgs),

    /// List applications known to the registry.
    Apps(AppsArgs),
}

fn main() -> Result<()> {
    appmgr_client::runtime::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Launch(args) => args.run(),
        Commands::Send(args) => args.run(),
        Commands::Stop(args) => args.run(),
        Commands::PowerOff(args) => args.run(),
        Commands::Listen(args) => args.run(),
        Commands::Apps(args) => args.run(),
    }
}
