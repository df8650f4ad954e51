use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    text: &'a str,
    timestamp: String,
}

pub fn print_message(text: &str, format: OutputFormat) {
    println!("{}", render_message(text, &now_unix_seconds(), format));
}

fn render_message(text: &str, timestamp: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                text,
                timestamp: timestamp.to_string(),
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TIME", "MESSAGE"])
                .add_row(vec![timestamp, text]);
            table.to_string()
        }
        OutputFormat::Pretty => format!("[{timestamp}] {text}"),
        OutputFormat::Raw => text.to_string(),
    }
}

/// Flush stdout so piped readers see each message as it arrives.
pub fn flush() {
    let _ = std::io::stdout().flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
