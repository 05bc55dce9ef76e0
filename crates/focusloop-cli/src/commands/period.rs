use clap::Subcommand;

use super::{open_engine, print_json, CmdResult};

#[derive(Subcommand)]
pub enum PeriodAction {
    /// Begin a new focus period
    Start {
        /// Work sessions to complete (defaults to cycle.target_rounds)
        #[arg(long)]
        rounds: Option<u32>,
    },
    /// Show focus period progress
    Status,
}

pub async fn run(action: PeriodAction) -> CmdResult {
    let mut engine = open_engine().await?;
    engine.sync().await;

    match action {
        PeriodAction::Start { rounds } => {
            let rounds = rounds.unwrap_or(engine.config().cycle.target_rounds);
            let event = engine.start_focus_period(rounds).await;
            print_json(&event)
        }
        PeriodAction::Status => print_json(&engine.counters()),
    }
}
