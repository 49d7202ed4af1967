//! Report command implementations

use anyhow::Result;
use digifin_core::Database;

use super::truncate;

const BAR_WIDTH: usize = 30;

/// Horizontal bar scaled against `max`
fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(len.min(BAR_WIDTH))
}

pub fn cmd_report_by_category(db: &Database, json: bool) -> Result<()> {
    let totals = db.spending_by_category()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    if totals.is_empty() {
        println!("No expenses yet.");
        return Ok(());
    }

    let grand_total: f64 = totals.iter().map(|t| t.total).sum();
    let max = totals.iter().map(|t| t.total).fold(0.0, f64::max);

    println!();
    println!("🥧 Spending by Category");
    println!("   ─────────────────────────────────────────────────────────────");
    for t in &totals {
        let pct = if grand_total > 0.0 {
            t.total / grand_total * 100.0
        } else {
            0.0
        };
        println!(
            "   {:<16} {:>10.2} {:>5.1}%  {}",
            truncate(&t.category, 16),
            t.total,
            pct,
            bar(t.total, max)
        );
    }
    println!();

    Ok(())
}

pub fn cmd_report_over_time(db: &Database, json: bool) -> Result<()> {
    let totals = db.spending_over_time()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    if totals.is_empty() {
        println!("No expenses yet.");
        return Ok(());
    }

    let max = totals.iter().map(|t| t.total).fold(0.0, f64::max);

    println!();
    println!("📈 Spending over Time");
    println!("   ─────────────────────────────────────────────────────────────");
    for t in &totals {
        println!(
            "   {}  {:>10.2}  ({:>2})  {}",
            t.date,
            t.total,
            t.count,
            bar(t.total, max)
        );
    }
    println!();

    Ok(())
}

pub fn cmd_report_summary(db: &Database, json: bool) -> Result<()> {
    let summary = db.dashboard_summary()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│           💰 DigiFin Dashboard          │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Total spent:     {:.2}", summary.total_spent);
    println!("  Categories:      {}", summary.category_count);
    println!("  Expenses:        {}", summary.expense_count);
    println!();

    Ok(())
}
