//! ccstats - usage limits for coding assistants.
//!
//! Reads Codex credentials, asks `codex app-server` for the live rate-limit
//! windows and prints them as progress bars.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ccstats::codex::{self, CodexError};
use ccstats::config::Settings;
use ccstats::display::{self, ColorConfig};

#[derive(Debug, Parser)]
#[command(name = "ccstats", version, about = "Show Codex usage limits")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check whether Codex credentials are available
    #[command(alias = "auth")]
    Status,
    /// Show Codex usage limits
    Codex {
        #[command(subcommand)]
        action: Option<CodexAction>,
    },
}

#[derive(Debug, Subcommand)]
enum CodexAction {
    /// Check whether Codex credentials are available
    #[command(alias = "auth")]
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ccstats=warn".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    tracing::debug!("Settings: {:?}", settings);

    match run(cli, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let mut stdout = io::stdout().lock();

    match cli.command {
        Some(Command::Status)
        | Some(Command::Codex {
            action: Some(CodexAction::Status),
        }) => print_status(&mut stdout, settings),
        Some(Command::Codex { action: None }) => {
            let usage = codex::fetch_usage(settings).await?;
            print_usage(&mut stdout, &usage, settings)
        }
        None => match codex::fetch_usage(settings).await {
            Ok(usage) => print_usage(&mut stdout, &usage, settings),
            Err(CodexError::AuthNotFound) => {
                eprintln!("Codex not authenticated: run `codex login` to show Codex limits");
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
    }
}

fn print_usage<W: Write>(w: &mut W, usage: &codex::Usage, settings: &Settings) -> Result<()> {
    let color = ColorConfig::detect(settings.color);
    display::write_codex_usage(w, usage, Utc::now(), color).context("Failed to write usage")
}

fn print_status<W: Write>(w: &mut W, settings: &Settings) -> Result<()> {
    let location = settings
        .codex_auth_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.codex/auth.json".to_string());

    if codex::has_credentials(settings) {
        writeln!(
            w,
            "Codex authenticated: Valid credentials found in {}",
            location
        )?;
    } else {
        writeln!(
            w,
            "Codex not authenticated: No credentials found in {}",
            location
        )?;
        writeln!(w, "Run `codex login` to authenticate")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["ccstats"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["ccstats", "auth"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Status)));

        let cli = Cli::try_parse_from(["ccstats", "codex", "status"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Codex {
                action: Some(CodexAction::Status)
            })
        ));
    }

    #[test]
    fn test_print_status_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_lookup(|_| None, Some(dir.path().to_path_buf()));

        let mut buf = Vec::new();
        print_status(&mut buf, &settings).unwrap();
        let output = String::from_utf8(buf).unwrap();

        assert!(output.starts_with("Codex not authenticated"));
        assert!(output.contains("codex login"));
    }
}
