use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "debrief")]
#[command(about = "Summaries, action items and follow-ups from meeting transcripts", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the pipeline over one or more transcript files, in order
    Process(ProcessCliArgs),
    /// Inspect the configuration
    Config(ConfigCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct ProcessCliArgs {
    /// Transcript files (plain text). Later files see earlier ones as history.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Meeting title; defaults to the file name
    #[arg(short, long)]
    pub title: Option<String>,
    /// Print results as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ConfigCliArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets masked)
    Show,
    /// Print the config file location
    Path,
}
