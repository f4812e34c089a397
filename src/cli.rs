use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{config::Config, protocol};

/// The command line interface for serial bridge.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a configuration file
    pub config: Option<PathBuf>,

    /// Directory for daily-rolling log files.
    /// Logs go to stdout only when unset.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Commands available in the command line interface.
#[derive(Subcommand)]
pub enum Commands {
    /// Examples for user convenience.
    #[clap(subcommand)]
    Examples(Examples),
}

/// Helpful examples for users.
#[derive(Subcommand, Clone)]
pub enum Examples {
    /// Show an example of a configuration file's contents.
    Config,

    /// Show an example JSON event as broadcast to subscribed clients.
    Event,

    /// Show an example JSON command submission.
    Command,
}

/// Print whatever the given subcommand asks for.
pub fn handle_command(command: Commands) {
    let Commands::Examples(example) = command;

    match example {
        Examples::Config => println!("{}", Config::example().serialize_pretty()),
        Examples::Event => println!("{}", protocol::Event::example().serialize()),
        Examples::Command => println!("{}", protocol::CommandRequest::example().serialize()),
    }
}
