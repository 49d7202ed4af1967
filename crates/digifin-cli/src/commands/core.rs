//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Database and AI backend status

use std::path::Path;

use anyhow::{Context, Result};
use digifin_core::db::{Database, DB_KEY_ENV};
use digifin_core::{AIBackend, AIClient, ResolverConfig};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let count = db.count_expenses().context("Failed to read expenses")?;
    println!("   Expenses on record: {}", count);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record an expense: digifin add -i Coffee -a 5 -c Food -d 2024-01-01");
    println!("  2. Ask about it: digifin ask \"What's my total?\"");
    println!("  3. Start web UI: digifin serve");

    Ok(())
}

pub async fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!();
    println!("📊 DigiFin Status");
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = std::fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                let opened = if db.is_encrypted() {
                    "🔒 encrypted"
                } else {
                    "⚠️  unencrypted"
                };
                println!("   Opened: {}", opened);
                if let Ok(summary) = db.dashboard_summary() {
                    println!();
                    println!("   Expenses: {}", summary.expense_count);
                    println!("   Categories: {}", summary.category_count);
                    println!("   Total spent: {}", summary.total_spent);
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    let config = ResolverConfig::from_env();
    println!();
    println!(
        "   Chatbot: currency {}, food match {}, timeout {}s",
        config.currency_symbol,
        config.food_match.as_str(),
        config.timeout.as_secs()
    );
    match AIClient::from_env() {
        Some(ai) => {
            let state = if ai.health_check().await {
                "✅ reachable"
            } else {
                "⚠️  not responding"
            };
            println!("   AI backend: {} ({}) {}", ai.host(), ai.model(), state);
        }
        None => {
            println!("   AI backend: not configured (set GEMINI_API_KEY)");
        }
    }

    println!();
    Ok(())
}
