//! DigiFin CLI - Personal expense tracker
//!
//! Usage:
//!   digifin init                          Initialize database
//!   digifin add -i Coffee -a 5 -c Food -d 2024-01-01
//!   digifin ask "What's my total?"        Ask the chatbot
//!   digifin serve --port 3000             Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt).await,
        Commands::Add {
            item,
            amount,
            category,
            note,
            date,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_add(&db, &item, amount, &category, note.as_deref(), &date)
        }
        Commands::List => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_list(&db, cli.json)
        }
        Commands::Delete { id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_delete(&db, id)
        }
        Commands::Report { report } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match report {
                ReportType::ByCategory => commands::cmd_report_by_category(&db, cli.json),
                ReportType::OverTime => commands::cmd_report_over_time(&db, cli.json),
                ReportType::Summary => commands::cmd_report_summary(&db, cli.json),
            }
        }
        Commands::Ask { query } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let resolver = digifin_core::QueryResolver::from_env();
            commands::cmd_ask(&db, &resolver, &query).await
        }
        Commands::Chat => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let resolver = digifin_core::QueryResolver::from_env();
            commands::cmd_chat(&db, &resolver).await
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
    }
}
