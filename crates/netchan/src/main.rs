mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "netchan", version, about = "Chat over typed network channels")]
struct Cli {
    /// Output format for received messages.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format).await;

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_default_address() {
        let cli = Cli::try_parse_from(["netchan", "serve"]).expect("serve args should parse");
        match cli.command {
            Command::Serve(args) => assert_eq!(args.addr, "127.0.0.1:1234"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_chat_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "netchan",
            "chat",
            "10.0.0.1:9000",
            "--keepalive",
            "5",
            "--format",
            "raw",
            "--log-level",
            "debug",
        ])
        .expect("chat args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Raw)));
        match cli.command {
            Command::Chat(args) => {
                assert_eq!(args.addr, "10.0.0.1:9000");
                assert_eq!(args.keepalive, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_keepalive() {
        let err = Cli::try_parse_from(["netchan", "chat", "127.0.0.1:1", "--keepalive", "0"])
            .expect_err("zero keepalive should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn chat_requires_address() {
        let err = Cli::try_parse_from(["netchan", "chat"]).expect_err("address is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
