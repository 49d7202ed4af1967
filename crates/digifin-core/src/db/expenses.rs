//! Expense operations

use chrono::NaiveDate;
use rusqlite::{params, Row};
use tracing::{debug, warn};

use super::subscriptions::SnapshotCallback;
use super::{parse_datetime, Database, Subscription};
use crate::error::Result;
use crate::models::{Expense, NewExpense};

const EXPENSE_COLUMNS: &str = "id, item, amount, category, note, date, created_at";

/// The store the dashboard and chatbot read from
///
/// `subscribe` delivers the current list right away and again after every
/// `add` or `remove` that changes it.
pub trait ExpenseStore {
    fn add(&self, expense: &NewExpense) -> Result<Expense>;
    fn list(&self) -> Result<Vec<Expense>>;
    /// Returns false if no expense had that id
    fn remove(&self, id: i64) -> Result<bool>;
    fn subscribe(&self, callback: SnapshotCallback) -> Result<Subscription>;
}

fn row_to_expense(row: &Row) -> rusqlite::Result<Expense> {
    let date_str: String = row.get(5)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at_str: String = row.get(6)?;

    Ok(Expense {
        id: row.get(0)?,
        item: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        note: row.get(4)?,
        date,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Insert a validated expense and return the stored record
    pub fn insert_expense(&self, expense: &NewExpense) -> Result<Expense> {
        expense.validate()?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (item, amount, category, note, date) VALUES (?, ?, ?, ?, ?)",
            params![
                expense.item.trim(),
                expense.amount,
                expense.category.trim(),
                expense.normalized_note(),
                expense.date.format("%Y-%m-%d").to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        let stored = conn.query_row(
            &format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS),
            params![id],
            row_to_expense,
        )?;
        drop(conn);

        debug!(id, item = %stored.item, amount = stored.amount, "Inserted expense");
        self.publish_snapshot();
        Ok(stored)
    }

    /// List all expenses in insertion order
    pub fn list_expenses(&self) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM expenses ORDER BY id",
            EXPENSE_COLUMNS
        ))?;

        let expenses = stmt
            .query_map([], row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Get an expense by ID
    pub fn get_expense(&self, id: i64) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let expense = conn
            .query_row(
                &format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS),
                params![id],
                row_to_expense,
            )
            .ok();

        Ok(expense)
    }

    /// Count stored expenses
    pub fn count_expenses(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete an expense, returning whether it existed
    pub fn delete_expense(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM expenses WHERE id = ?", params![id])?;
        drop(conn);

        if deleted > 0 {
            debug!(id, "Deleted expense");
            self.publish_snapshot();
        }
        Ok(deleted > 0)
    }

    /// Register a snapshot listener
    pub fn subscribe_expenses(&self, callback: SnapshotCallback) -> Result<Subscription> {
        let _publishing = self.listeners.publishing();
        let snapshot = self.list_expenses()?;
        let subscription = self.listeners.register(callback);
        self.listeners.notify_one(subscription.id(), &snapshot);
        Ok(subscription)
    }

    /// Number of active snapshot listeners
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Push the current list to all listeners after a write
    ///
    /// The write has already succeeded, so a failed re-read is logged, not returned.
    /// The publish lock spans the re-read and the delivery, so a slower writer
    /// cannot overwrite a newer snapshot with an older one.
    fn publish_snapshot(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let _publishing = self.listeners.publishing();
        match self.list_expenses() {
            Ok(snapshot) => self.listeners.notify(&snapshot),
            Err(e) => warn!(error = %e, "Failed to load expenses for subscribers"),
        }
    }
}

impl ExpenseStore for Database {
    fn add(&self, expense: &NewExpense) -> Result<Expense> {
        self.insert_expense(expense)
    }

    fn list(&self) -> Result<Vec<Expense>> {
        self.list_expenses()
    }

    fn remove(&self, id: i64) -> Result<bool> {
        self.delete_expense(id)
    }

    fn subscribe(&self, callback: SnapshotCallback) -> Result<Subscription> {
        self.subscribe_expenses(callback)
    }
}
