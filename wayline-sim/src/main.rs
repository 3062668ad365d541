use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use wayline_sim::{drive, load_config, DriverOptions, Overrides, Scenario};

#[derive(Parser, Debug)]
#[command(name = "wayline-sim")]
#[command(
    about = "Pick a vessel and a waypoint, move the vessel there and print every layer event"
)]
#[command(version)]
struct Args {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Layer configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Distance from the vessel to the waypoint in meters
    #[arg(long, default_value_t = 1000.0)]
    distance: f64,

    /// Transit duration in ms (overrides the config file)
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Arrival distance in meters (overrides the config file)
    #[arg(long)]
    stopping_distance: Option<f64>,

    /// Step interval in ms
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Keep stepping this long after arrival
    #[arg(long, default_value_t = 2000)]
    linger_ms: u64,

    /// Give up after this long
    #[arg(long, default_value_t = 60000)]
    timeout_ms: u64,

    /// Also print trace render passes
    #[arg(long)]
    renders: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let mut config = load_config(args.config.as_deref());
    Overrides {
        duration_ms: args.duration_ms,
        stopping_distance: args.stopping_distance,
    }
    .apply(&mut config);
    log::info!(
        "Moving {}m over {}ms, arrival within {}m",
        args.distance,
        config.animation.duration_ms,
        config.animation.stopping_distance_meters
    );

    let scenario = Scenario {
        distance_m: args.distance,
        record_renders: args.renders,
        ..Default::default()
    };
    let mut sim = scenario.build(config);
    let options = DriverOptions {
        frame_ms: args.frame_ms,
        linger_ms: args.linger_ms,
        timeout_ms: args.timeout_ms,
    };

    let mut stdout = std::io::stdout().lock();
    let summary = drive(&mut sim, &options, &mut stdout).await?;
    match summary.settled_at_ms {
        Some(at) => log::info!("Arrived after {}ms, {} events", at, summary.events),
        None => anyhow::bail!("Transit did not complete within {}ms", options.timeout_ms),
    }
    Ok(())
}
