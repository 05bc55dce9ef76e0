use clap::Subcommand;
use focusloop_core::MoodState;

use super::{open_engine, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SignalsAction {
    /// Update energy and/or mood; omitted values are kept
    Set {
        /// 1 (drained) to 5 (energized)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        energy: Option<u8>,
        /// motivated, neutral, struggling or hyperfocus
        #[arg(long)]
        mood: Option<MoodState>,
    },
    /// Show the current signals
    Show,
}

pub async fn run(action: SignalsAction) -> CmdResult {
    let mut engine = open_engine().await?;

    match action {
        SignalsAction::Set { energy, mood } => {
            let mut signals = engine.signals();
            if let Some(energy) = energy {
                signals.energy_level = energy;
            }
            if let Some(mood) = mood {
                signals.mood = mood;
            }
            engine.set_signals(signals).await;
            print_json(&signals)
        }
        SignalsAction::Show => print_json(&engine.signals()),
    }
}
