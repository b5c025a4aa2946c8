//! cellfix demo agent.
//!
//! Drives one GNSS acquisition against a simulated BG95-M5 and logs the
//! outcome. Useful for exercising the acquisition pipeline end to end
//! without modem hardware:
//!
//! ```text
//! cellfix-agent --fix-after 3 --publish
//! ```

mod sim;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cellfix_core::{LocationConfig, LocationResult, LocationSession};

/// cellfix demo acquisition agent.
#[derive(Parser, Debug)]
#[command(name = "cellfix-agent", about = "Drive a GNSS acquisition against a simulated modem")]
struct Cli {
    /// HDOP acceptance threshold (0-100).
    #[arg(long, default_value_t = 100.0)]
    hdop_threshold: f32,

    /// Horizontal accuracy acceptance threshold in meters.
    #[arg(long, default_value_t = 50.0)]
    hacc_threshold: f32,

    /// Maximum seconds to wait for a stable fix.
    #[arg(long, default_value_t = 90)]
    max_fix_wait: u64,

    /// Milliseconds between position polls.
    #[arg(long, default_value_t = 1000)]
    poll_interval: u64,

    /// Number of no-fix polls the simulated modem answers before fixing.
    #[arg(long, default_value_t = 3)]
    fix_after: u32,

    /// Publish the acquired point as a loc event (printed to stdout).
    #[arg(long, default_value_t = false)]
    publish: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(fix_after = cli.fix_after, "cellfix-agent starting");

    let session = LocationSession::new(
        Arc::new(sim::SimulatedModem::new(cli.fix_after)),
        Some(Arc::new(sim::LoggedAntenna)),
        Some(Arc::new(sim::StdoutPublisher)),
    )?;
    session.begin(
        LocationConfig::default()
            .with_hdop_threshold(cli.hdop_threshold)
            .with_hacc_threshold(cli.hacc_threshold)
            .with_max_fix_wait(Duration::from_secs(cli.max_fix_wait))
            .with_poll_interval(Duration::from_millis(cli.poll_interval)),
    );

    tracing::info!("starting acquisition");
    let (result, point) = session.get_location(cli.publish);
    tracing::info!(?result, "acquisition finished");

    if result == LocationResult::Fixed {
        tracing::info!(
            latitude = point.latitude,
            longitude = point.longitude,
            altitude = point.altitude,
            hdop = point.horizontal_dop,
            sats = point.sats_in_use,
            ttff = point.time_to_first_fix,
            "position fixed"
        );
        println!("{}", serde_json::to_string_pretty(&point)?);
    }

    Ok(())
}
