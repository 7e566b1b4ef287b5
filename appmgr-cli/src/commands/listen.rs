//! `appmgr listen <name>` — register and print incoming signals until
//! ctrl-c or a `stop` signal.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use tokio::sync::broadcast;

use appmgr_cli::session::Session;
use appmgr_client::{runtime, AppClient, Registration};
use appmgr_core::{InstanceType, Priority};

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Registration name; only the part before the first '.' is used.
    pub name: String,

    /// Register as a multi-instance application when the registry has no flag.
    #[arg(long)]
    pub multi: bool,

    /// Priority written when the registry has none.
    #[arg(long)]
    pub priority: Option<u32>,

    /// Milliseconds each pump iteration waits for traffic.
    #[arg(long, default_value_t = runtime::PUMP_INTERVAL.as_millis() as u64)]
    pub poll_ms: u64,
}

fn event(label: &str, detail: impl std::fmt::Display) {
    println!(
        "{} {:<13} {detail}",
        Local::now().format("%H:%M:%S%.3f").to_string().bright_black(),
        label.bold()
    );
}

impl ListenArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open().context("failed to load client configuration")?;
        let bus = session
            .connect()
            .with_context(|| format!("cannot reach bus at {}", session.socket().display()))?;

        let instance_type = if self.multi {
            InstanceType::Multiple
        } else {
            InstanceType::Single
        };
        let registration = Registration::new(self.name.clone())
            .instance_type(instance_type)
            .priority(self.priority.map(Priority).unwrap_or_default());

        let Session {
            config, registry, ..
        } = session;
        let mut client = AppClient::register(registration, bus, registry, config)
            .with_context(|| format!("failed to register '{}'", self.name))?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(4);
        let stop_tx = shutdown_tx.clone();
        client.on_stop(move || {
            event("stop", "stop requested");
            let _ = stop_tx.send(());
        });
        client.on_exec(|params| event("exec", params.join(" ")));
        client.on_message(|params| event("message", params.join(" ")));
        client.on_rotate(|rotation| event("rotate", format!("{rotation:?}")));
        client.on_death(|pid| event("app-exit", format!("pid {pid}")));
        client.on_focus_gained(|| event("focus", "gained"));
        client.on_focus_lost(|| event("focus", "lost"));

        println!(
            "{} Listening as '{}' on {} (ctrl-c to quit)",
            "●".green(),
            client.instance_name(),
            client.context().addresses.interface
        );

        let poll = Duration::from_millis(self.poll_ms.max(1));
        let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        tokio_runtime.block_on(async move {
            let ctrl_c = runtime::spawn_ctrl_c(shutdown_tx.clone());
            let result = runtime::run_until_shutdown(client, shutdown_rx, poll).await;
            let _ = shutdown_tx.send(());
            let _ = ctrl_c.await;
            result.map(|_| ())
        })?;

        println!("{} Stopped listening", "●".bright_black());
        Ok(())
    }
}
