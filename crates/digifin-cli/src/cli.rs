//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// DigiFin - Track expenses and ask about them in any language
#[derive(Parser)]
#[command(name = "digifin")]
#[command(about = "Personal expense tracker with a multilingual chatbot", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "digifin.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set DIGIFIN_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Output JSON instead of tables (list, report)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Record an expense
    Add {
        /// What was bought
        #[arg(short, long)]
        item: String,

        /// Amount spent (non-negative)
        #[arg(short, long)]
        amount: f64,

        /// Category label, e.g. Food, Travel
        #[arg(short, long)]
        category: String,

        /// Optional note
        #[arg(short, long)]
        note: Option<String>,

        /// Date of the expense (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
    },

    /// List recorded expenses
    List,

    /// Delete an expense by ID
    Delete {
        /// Expense ID
        id: i64,
    },

    /// Show chart data
    Report {
        #[command(subcommand)]
        report: ReportType,
    },

    /// Ask the chatbot a single question
    Ask {
        /// The question, in any language
        query: String,
    },

    /// Start an interactive chat session
    Chat,

    /// Show database and AI backend status
    Status,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        #[arg(long)]
        no_auth: bool,

        /// Directory of static files (the web UI) to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Spending per category (pie chart data)
    ByCategory,

    /// Spending per day (line chart data)
    OverTime,

    /// Total spent, category and expense counts
    Summary,
}
