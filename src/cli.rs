use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat bot relaying room messages to a text completion API", long_about = None)]
pub struct Args {
    /// Config file (defaults to ~/.aibud/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format [possible values: pretty, json]
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Connect to Discord with DISCORD_BOT_TOKEN
    Discord,

    /// Chat locally in the terminal
    Console {
        /// Room id used as the session key
        #[arg(long, default_value = "console")]
        room: String,

        /// Display name for your messages
        #[arg(long, default_value = "User")]
        name: String,
    },
}
