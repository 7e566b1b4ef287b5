//! `appmgr apps` — registry overview.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use appmgr_cli::session::Session;
use appmgr_core::{ConfigStore, InstanceType, RegistryClient};

#[derive(Args, Debug)]
pub struct AppsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
struct AppRow {
    name: String,
    app_id: i32,
    pid: i32,
    priority: Option<u32>,
    visible: bool,
    instance_type: InstanceType,
    last_instance: i32,
}

#[derive(Tabled)]
struct AppTableRow {
    #[tabled(rename = "app")]
    name: String,
    #[tabled(rename = "id")]
    app_id: i32,
    #[tabled(rename = "pid")]
    pid: i32,
    #[tabled(rename = "priority")]
    priority: String,
    #[tabled(rename = "visible")]
    visible: String,
    #[tabled(rename = "instances")]
    instances: String,
}

impl AppsArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open().context("failed to load client configuration")?;
        let rows = collect_rows(&session.registry).context("failed to read registry")?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize apps JSON")?
            );
            return Ok(());
        }
        print_table(rows, session.registry.shutdown_flag().unwrap_or(false));
        Ok(())
    }
}

fn collect_rows<S: ConfigStore>(registry: &RegistryClient<S>) -> Result<Vec<AppRow>> {
    let mut rows = Vec::new();
    for app in registry.list_apps()? {
        let app_id = registry.app_id(&app)?;
        rows.push(AppRow {
            app_id,
            pid: registry.pid(&app)?,
            priority: registry.priority(&app)?.map(|p| p.0),
            visible: registry.visibility(&app)?,
            instance_type: registry.instance_type(app_id)?.unwrap_or_default(),
            last_instance: registry.last_instance_id(&app)?,
            name: app.to_string(),
        });
    }
    Ok(rows)
}

fn print_table(rows: Vec<AppRow>, shutting_down: bool) {
    if shutting_down {
        println!("{}", "Shutdown in progress".red().bold());
    }
    if rows.is_empty() {
        println!("No applications registered.");
        return;
    }

    let table_rows: Vec<AppTableRow> = rows
        .into_iter()
        .map(|row| AppTableRow {
            name: row.name,
            app_id: row.app_id,
            pid: row.pid,
            priority: row
                .priority
                .map_or_else(|| "-".to_string(), |p| p.to_string()),
            visible: if row.visible { "yes" } else { "no" }.to_string(),
            instances: match row.instance_type {
                InstanceType::Single => "single".to_string(),
                InstanceType::Multiple => format!("multiple (last {})", row.last_instance),
            },
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
}
