use focusloop_core::{AggregateStats, FocusPeriodCounters};
use serde::Serialize;

use super::{open_engine, print_json, CmdResult};

#[derive(Serialize)]
struct StatsReport {
    stats: AggregateStats,
    counters: FocusPeriodCounters,
}

pub async fn run() -> CmdResult {
    let mut engine = open_engine().await?;
    // Close anything that ran out while no one was watching first.
    engine.sync().await;
    print_json(&StatsReport {
        stats: engine.aggregate_stats(),
        counters: engine.counters(),
    })
}
