use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod chat;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a chat server that relays messages between all clients.
    Serve(ServeArgs),
    /// Connect to a chat server, sending stdin lines and printing messages.
    Chat(ChatArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args).await,
        Command::Chat(args) => chat::run(args, format).await,
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// TCP address to listen on.
    #[arg(default_value = "127.0.0.1:1234")]
    pub addr: String,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// TCP address of the chat server.
    pub addr: String,
    /// Seconds between keep-alive packets.
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub keepalive: u64,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
