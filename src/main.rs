use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

mod config;
mod dashboard;
mod logos;
mod models;
mod providers;
mod registry;
mod scheduler;
mod store;

use config::Config;
use dashboard::AppState;
use logos::LogoCatalog;
use providers::ProviderSet;
use registry::LeagueRegistry;
use scheduler::rollover::RolloverPolicy;
use scheduler::{Clock, ScoreScheduler};
use store::AggregateStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    let tz = config.timezone()?;
    info!(
        "Timezone {} (rollover at {:02}:00, always show today: {})",
        tz, config.rollover_hours, config.always_show_today
    );

    let registry = Arc::new(LeagueRegistry::builtin()?);
    info!("League registry loaded: {} leagues", registry.len());

    let sports = config::load_sports(&config.sports_file)
        .with_context(|| format!("loading {}", config.sports_file))?;
    let entries = registry.build_entries(&sports);
    if entries.is_empty() {
        anyhow::bail!("{} lists no known leagues", config.sports_file);
    }
    info!("Tracking {} league entries", entries.len());

    let logos = Arc::new(LogoCatalog::scan(
        &config.logos_dir,
        &config.custom_logos_dir,
    ));
    let providers = ProviderSet::standard(&registry)?;

    let (updates, _) = broadcast::channel(256);
    let store = AggregateStore::shared();

    let scheduler = ScoreScheduler::new(
        entries.clone(),
        providers,
        RolloverPolicy {
            rollover_hour: config.rollover_hours,
            always_show_today: config.always_show_today,
        },
        Arc::new(config.display_options()?),
        Clock::new(
            tz,
            config.debug_hours,
            config.debug_minutes,
            config.debug_game_date,
        ),
        store.clone(),
        logos,
        Arc::clone(&registry),
        updates.clone(),
    );
    tokio::spawn(scheduler.run());

    // Start the dashboard HTTP server
    let app = dashboard::router(
        AppState {
            store,
            updates,
            entries,
        },
        &config.logos_dir,
        &config.custom_logos_dir,
    );
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run dashboard server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
