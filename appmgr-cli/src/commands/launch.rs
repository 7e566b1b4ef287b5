//! `appmgr launch <app[:N]> [args...]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use appmgr_cli::session::Session;
use appmgr_client::{LaunchNegotiator, LaunchOutcome};

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Target application, `app` or `app:N`.
    pub application: String,

    /// Arguments passed to the application unchanged.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl LaunchArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open().context("failed to load client configuration")?;
        let mut bus = session
            .connect()
            .with_context(|| format!("cannot reach bus at {}", session.socket().display()))?;

        let outcome = LaunchNegotiator::new(&session.config)
            .launch(&mut bus, &session.registry, &self.application, &self.args)
            .with_context(|| format!("failed to launch '{}'", self.application))?;

        match outcome {
            LaunchOutcome::Launched { instance_id } => println!(
                "{} Launched '{}' (instance {instance_id})",
                "✓".green(),
                self.application
            ),
            LaunchOutcome::Restored { target, params } => println!(
                "{} '{target}' already running, sent restore with {} parameter(s)",
                "↺".yellow(),
                params.len()
            ),
        }
        Ok(())
    }
}
