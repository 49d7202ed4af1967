//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init, status, and shared utilities (open_db)
//! - `expenses` - Add, list, delete
//! - `reports` - Chart data (by category, over time, summary)
//! - `chat` - One-shot and interactive chatbot
//! - `serve` - Web server command

pub mod chat;
pub mod core;
pub mod expenses;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use chat::*;
pub use self::core::*;
pub use expenses::*;
pub use reports::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
