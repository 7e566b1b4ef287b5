//! `appmgr power-off`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use appmgr_cli::session::Session;
use appmgr_client::Messenger;

#[derive(Args, Debug)]
pub struct PowerOffArgs {}

impl PowerOffArgs {
    pub fn run(self) -> Result<()> {
        let mut session = Session::open().context("failed to load client configuration")?;
        let mut bus = session
            .connect()
            .with_context(|| format!("cannot reach bus at {}", session.socket().display()))?;
        Messenger::new(&session.config.app_manager)
            .power_off(&mut bus, &mut session.registry)
            .context("power off failed")?;
        println!("{} Shutdown flag set, stop broadcast sent", "⏻".red());
        Ok(())
    }
}
