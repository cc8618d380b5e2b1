mod backend;
mod cli;
mod db;
mod models;
mod settings;
mod tui;
mod views;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Commands, Workspace};
use crate::settings::Settings;

/// Logs go to stderr. `RUST_LOG` wins over the configured filter; the
/// terminal UI stays at `warn` so the alternate screen is left alone.
fn init_tracing(settings: &Settings, tui: bool) {
    let fallback = if tui { "taskboard=warn" } else { settings.log_filter() };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let home = Settings::home()?;
    let settings = Settings::load(&home);
    init_tracing(&settings, matches!(cli.command, Commands::Tui));
    tracing::debug!(home = %home.display(), "taskboard starting");

    let mut workspace = Workspace::open(home, &settings)?;
    cli::run(cli.command, &mut workspace).await
}
