pub mod args;
pub mod config;
pub mod process;

pub use args::{Cli, CliCommand, ConfigCliArgs, ConfigCommand, ProcessCliArgs};
pub use config::handle_config_command;
pub use process::handle_process_command;
