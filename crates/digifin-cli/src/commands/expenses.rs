//! Expense command implementations (add, list, delete)

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use digifin_core::{Database, NewExpense};

use super::truncate;

/// Parse a YYYY-MM-DD date argument
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}' (use YYYY-MM-DD)", date))
}

pub fn cmd_add(
    db: &Database,
    item: &str,
    amount: f64,
    category: &str,
    note: Option<&str>,
    date: &str,
) -> Result<()> {
    let mut expense = NewExpense::new(item, amount, category, parse_date(date)?);
    if let Some(note) = note {
        expense = expense.with_note(note);
    }

    let stored = db.insert_expense(&expense).context("Failed to add expense")?;

    println!(
        "✅ Added #{}: {} ({}) {} on {}",
        stored.id, stored.item, stored.category, stored.amount, stored.date
    );
    Ok(())
}

pub fn cmd_list(db: &Database, json: bool) -> Result<()> {
    let expenses = db.list_expenses()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&expenses)?);
        return Ok(());
    }

    if expenses.is_empty() {
        println!("No expenses yet. Add one with: digifin add -i Coffee -a 5 -c Food -d 2024-01-01");
        return Ok(());
    }

    println!();
    println!(
        "   {:>5}  {:<10}  {:<24}  {:<14}  {:>10}  Note",
        "ID", "Date", "Item", "Category", "Amount"
    );
    println!("   {}", "─".repeat(80));
    for e in &expenses {
        println!(
            "   {:>5}  {:<10}  {:<24}  {:<14}  {:>10}  {}",
            e.id,
            e.date,
            truncate(&e.item, 24),
            truncate(&e.category, 14),
            e.amount,
            e.note.as_deref().map(|n| truncate(n, 30)).unwrap_or_default()
        );
    }
    println!();
    println!("   {} expense(s)", expenses.len());

    Ok(())
}

pub fn cmd_delete(db: &Database, id: i64) -> Result<()> {
    if !db.delete_expense(id)? {
        bail!("Expense #{} not found", id);
    }
    println!("🗑️  Deleted expense #{}", id);
    Ok(())
}
