//! `appmgr-launch <application> [args...]`
//!
//! Asks the application manager to launch `application`, forwarding every
//! trailing argument verbatim. The exit code is the client status code:
//! 0 on success (including restoring an already running instance).
//!
//! There is no `--help` or `--version`: every argument after the target
//! belongs to the application.

use std::process::ExitCode;

use clap::Parser;

use appmgr_cli::session::Session;
use appmgr_client::{runtime, ClientError, LaunchNegotiator, LaunchOutcome};
use appmgr_core::InstanceName;

#[derive(Parser, Debug)]
#[command(
    name = "appmgr-launch",
    about = "Launch or restore an application through the application manager",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct LaunchCli {
    /// Target application, `app` or `app:N`.
    application: String,

    /// Arguments passed to the application unchanged.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn launch(cli: &LaunchCli) -> Result<LaunchOutcome, ClientError> {
    InstanceName::parse(&cli.application)?;
    let session = Session::open()?;
    let mut bus = session.connect()?;
    LaunchNegotiator::new(&session.config).launch(
        &mut bus,
        &session.registry,
        &cli.application,
        &cli.args,
    )
}

fn main() -> ExitCode {
    runtime::init_tracing();
    let cli = LaunchCli::parse();
    match launch(&cli) {
        Ok(LaunchOutcome::Launched { instance_id }) => {
            println!("launched {} (instance {instance_id})", cli.application);
            ExitCode::SUCCESS
        }
        Ok(LaunchOutcome::Restored { target, .. }) => {
            println!("{target} already running, restored");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("appmgr-launch: {err}");
            // Process exit statuses are one byte wide; -1 reports as 255.
            ExitCode::from(err.status_code() as u8)
        }
    }
}
