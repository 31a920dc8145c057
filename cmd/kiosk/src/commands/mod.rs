//! CLI commands module.

mod config;
mod replay;
mod session;

pub use config::ConfigCommand;
pub use replay::ReplayCommand;
