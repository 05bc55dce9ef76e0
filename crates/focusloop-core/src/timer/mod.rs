pub mod driver;
mod engine;
pub mod machine;

pub use driver::{spawn_sync_loop, EngineHandle, SyncLoop};
pub use engine::{Collaborators, CurrentView, FocusEngine, PendingContinuation};
pub use machine::MachineState;
