use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracking_core::{
    config::{load_settings, load_settings_from},
    ApplyOutcome, FixtureFeed, SimulatedFeed, TelemetryFeed, TrackingDashboard, TrackingError,
};

#[derive(Parser, Debug)]
struct Args {
    /// Falls back to `default_tracking_id` from the config.
    #[arg(long)]
    tracking_id: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON file of orders; without it the simulated feed is used.
    #[arg(long)]
    fixture: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    polls: u32,
    /// Zoom in this many times after the first snapshot.
    #[arg(long, default_value_t = 0)]
    zoom_in: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => load_settings_from(path, |key| std::env::var(key).ok()),
        None => load_settings(),
    };

    let feed: Arc<dyn TelemetryFeed> = match &args.fixture {
        Some(path) => Arc::new(
            FixtureFeed::load(path, settings.feed_latency())
                .with_context(|| format!("cannot use fixture {}", path.display()))?,
        ),
        None => Arc::new(SimulatedFeed::new(
            settings.feed_latency(),
            settings.progress_step,
        )),
    };
    let dashboard = TrackingDashboard::from_settings(feed, &settings);

    let query = args
        .tracking_id
        .clone()
        .or_else(|| settings.default_tracking_id.clone())
        .unwrap_or_default();

    let handle = match dashboard.submit(&query) {
        Ok(handle) => handle,
        Err(TrackingError::EmptyQuery) => {
            println!("{}", TrackingError::EmptyQuery);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    print_view(&dashboard)?;
    let outcome = handle.settled().await?;
    info!(?outcome, "initial lookup settled");
    print_view(&dashboard)?;
    if outcome == ApplyOutcome::Failed {
        return Ok(());
    }

    for _ in 0..args.zoom_in {
        dashboard.zoom_in();
    }

    for poll in 1..=args.polls {
        tokio::time::sleep(settings.poll_interval()).await;
        let outcome = dashboard.refresh()?.settled().await?;
        if outcome != ApplyOutcome::Applied {
            warn!(poll, ?outcome, "poll did not update the order");
        }
        print_view(&dashboard)?;
    }

    Ok(())
}

fn print_view(dashboard: &TrackingDashboard) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&dashboard.view())?);
    Ok(())
}
