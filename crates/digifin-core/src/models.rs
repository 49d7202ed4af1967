//! Domain models for DigiFin

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A recorded expense
///
/// Records are immutable once stored: there is no update path, only delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub item: String,
    /// Always >= 0
    pub amount: f64,
    /// Free-text label (e.g. "Food", "Travel")
    pub category: String,
    pub note: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// An expense submission, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub item: String,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub note: Option<String>,
    pub date: NaiveDate,
}

impl NewExpense {
    pub fn new(item: &str, amount: f64, category: &str, date: NaiveDate) -> Self {
        Self {
            item: item.to_string(),
            amount,
            category: category.to_string(),
            note: None,
            date,
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    /// Check required fields and the amount invariant
    ///
    /// Fails on the first problem found; nothing is written on failure.
    pub fn validate(&self) -> Result<()> {
        if self.item.trim().is_empty() {
            return Err(Error::Validation("item is required".into()));
        }
        if self.category.trim().is_empty() {
            return Err(Error::Validation("category is required".into()));
        }
        if !self.amount.is_finite() {
            return Err(Error::Validation("amount must be a number".into()));
        }
        if self.amount < 0.0 {
            return Err(Error::Validation(format!(
                "amount must not be negative (got {})",
                self.amount
            )));
        }
        Ok(())
    }

    /// Note with surrounding whitespace removed; blank notes become `None`
    pub fn normalized_note(&self) -> Option<&str> {
        self.note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "bot" => Ok(Self::Bot),
            _ => Err(format!("Unknown sender: {}", s)),
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in a chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self {
            sender: Sender::User,
            text: text.to_string(),
        }
    }

    pub fn bot(text: &str) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.to_string(),
        }
    }
}

/// Spending in one category (pie chart slice)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: i64,
}

/// Spending on one day (line chart point)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: f64,
    pub count: i64,
}

/// Headline numbers for the dashboard cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_spent: f64,
    pub category_count: i64,
    pub expense_count: i64,
}
