//! Command implementations for the tsgm CLI

pub mod compile;
pub mod extract;
pub mod init;
pub mod watch;

// Re-export command functions
pub use compile::{compile_command, CompileArgs};
pub use extract::extract_command;
pub use init::init_config_command;
pub use watch::watch_command;
