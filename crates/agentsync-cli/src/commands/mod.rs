mod backups;
mod common;
mod init_config;
mod reset_state;
mod status;
mod sync;

pub use backups::{CleanBackups, ListBackups, Restore};
pub use common::load_engine;
pub use init_config::InitConfig;
pub use reset_state::ResetState;
pub use status::Status;
pub use sync::SyncCommand;
