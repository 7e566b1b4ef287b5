//! `appmgr send` and `appmgr stop` — one-shot signals to an instance.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use appmgr_cli::session::Session;
use appmgr_client::Messenger;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Receiving instance, `app` or `app:N`.
    pub target: String,

    /// Message parameters, delivered after the target name.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl SendArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open().context("failed to load client configuration")?;
        let mut bus = session
            .connect()
            .with_context(|| format!("cannot reach bus at {}", session.socket().display()))?;
        Messenger::new(&session.config.app_manager)
            .send_message(&mut bus, &self.target, &self.args)
            .with_context(|| format!("failed to message '{}'", self.target))?;
        println!("{} Sent message to '{}'", "✓".green(), self.target);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct StopArgs {
    /// Instance to stop, `app` or `app:N`.
    pub target: String,
}

impl StopArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open().context("failed to load client configuration")?;
        let mut bus = session
            .connect()
            .with_context(|| format!("cannot reach bus at {}", session.socket().display()))?;
        Messenger::new(&session.config.app_manager)
            .stop(&mut bus, &self.target)
            .with_context(|| format!("failed to stop '{}'", self.target))?;
        println!("{} Stop requested for '{}'", "✓".green(), self.target);
        Ok(())
    }
}
