use clap::Subcommand;
use focusloop_core::{SessionRecord, SessionType};

use super::{open_engine, print_json, CmdResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List closed sessions, newest first
    List {
        /// Only sessions of this type
        #[arg(long = "type", value_name = "TYPE")]
        session_type: Option<SessionType>,
        /// Maximum number of sessions
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a session from history
    Delete {
        /// Session ID
        id: String,
    },
}

pub async fn run(action: HistoryAction) -> CmdResult {
    let mut engine = open_engine().await?;
    engine.sync().await;

    match action {
        HistoryAction::List {
            session_type,
            limit,
        } => {
            let sessions: Vec<&SessionRecord> = engine
                .history()
                .iter()
                .rev()
                .filter(|r| session_type.map_or(true, |t| r.session_type == t))
                .take(limit.unwrap_or(usize::MAX))
                .collect();
            print_json(&sessions)
        }
        HistoryAction::Delete { id } => match engine.delete_session(&id).await {
            Some(event) => print_json(&event),
            None => Err(format!("session not found: {id}").into()),
        },
    }
}
