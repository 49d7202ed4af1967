//! DigiFin Core Library
//!
//! Shared functionality for the DigiFin expense tracker:
//! - Expense store (SQLite with optional encryption) and change subscriptions
//! - Chart and dashboard aggregation over recorded expenses
//! - Pluggable generative-text backends (Gemini, OpenAI-compatible, mock)
//! - Chatbot query resolver: keyword rules with a model fallback
//! - Append-only chat transcript

pub mod ai;
pub mod chat;
pub mod db;
pub mod error;
pub mod models;

/// Test utilities including a mock model server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, GeminiBackend, MockBackend, OpenAICompatibleBackend};
pub use chat::{
    CategoryMatch, QueryResolver, Resolution, ResolverConfig, Rule, ReplySource, Transcript,
};
pub use db::{AuditEntry, Database, ExpenseStore, Subscription};
pub use error::{Error, Result};
pub use models::{
    CategoryTotal, ChatMessage, DailyTotal, DashboardSummary, Expense, NewExpense, Sender,
};
