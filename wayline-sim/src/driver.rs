//! Wall-clock driver
//!
//! Runs a [`Simulation`] in real time on a tokio interval, the way a map
//! engine's render loop would: every tick the host clock jumps to the elapsed
//! wall time and one step is delivered. Recorded events are written out as
//! JSON lines after each step.

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::scenario::{SimRecord, Simulation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Time between steps
    pub frame_ms: u64,
    /// Keep running this long after the transit completes, so trails fade
    pub linger_ms: u64,
    /// Hard stop, whether or not the transit completed
    pub timeout_ms: u64,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            frame_ms: 16,
            linger_ms: 2_000,
            timeout_ms: 60_000,
        }
    }
}

/// What a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub events: usize,
    /// Simulated time at which the transit completed
    pub settled_at_ms: Option<u64>,
    pub elapsed_ms: u64,
}

/// Pick, then step the simulation until it settles and lingers, or times out
pub async fn drive<W: Write>(
    sim: &mut Simulation,
    options: &DriverOptions,
    out: &mut W,
) -> anyhow::Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut ticker = interval(Duration::from_millis(options.frame_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    if !sim.pick() {
        log::warn!("Transit did not start, check the scenario entities");
    }
    summary.events += emit(out, sim.drain())?;

    let start = Instant::now();
    loop {
        ticker.tick().await;
        let now_ms = start.elapsed().as_millis() as u64;
        sim.step_to(now_ms);
        summary.steps += 1;
        summary.events += emit(out, sim.drain())?;

        if summary.settled_at_ms.is_none() && sim.is_settled() {
            log::info!("Transit settled after {}ms", now_ms);
            summary.settled_at_ms = Some(now_ms);
        }
        let lingered = summary
            .settled_at_ms
            .map_or(false, |at| now_ms >= at + options.linger_ms);
        if lingered {
            break;
        }
        if now_ms >= options.timeout_ms {
            log::warn!("Stopping after {}ms without settling", now_ms);
            break;
        }
    }

    sim.finish();
    summary.events += emit(out, sim.drain())?;
    summary.elapsed_ms = sim.now_ms();
    log::debug!(
        "Run finished: {} steps, {} events",
        summary.steps,
        summary.events
    );
    Ok(summary)
}

fn emit<W: Write>(out: &mut W, records: Vec<SimRecord>) -> anyhow::Result<usize> {
    for record in &records {
        let line = serde_json::to_string(record).context("Failed to encode event")?;
        writeln!(out, "{}", line).context("Failed to write event")?;
    }
    out.flush().context("Failed to flush output")?;
    Ok(records.len())
}
