//! Chart and dashboard aggregation

use chrono::NaiveDate;

use super::Database;
use crate::error::Result;
use crate::models::{CategoryTotal, DailyTotal, DashboardSummary};

impl Database {
    /// Spending per category, in the order each category first appeared
    ///
    /// Categories are grouped by exact label, so "Food" and "food" are separate slices.
    pub fn spending_by_category(&self) -> Result<Vec<CategoryTotal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT category, SUM(amount), COUNT(*)
            FROM expenses
            GROUP BY category
            ORDER BY MIN(id)
            "#,
        )?;

        let totals = stmt
            .query_map([], |row| {
                Ok(CategoryTotal {
                    category: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(totals)
    }

    /// Spending per calendar day, oldest first
    pub fn spending_over_time(&self) -> Result<Vec<DailyTotal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT date, SUM(amount), COUNT(*)
            FROM expenses
            GROUP BY date
            ORDER BY date
            "#,
        )?;

        let totals = stmt
            .query_map([], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(DailyTotal {
                    date,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(totals)
    }

    /// Total spent, distinct categories, and number of expenses
    pub fn dashboard_summary(&self) -> Result<DashboardSummary> {
        let conn = self.conn()?;
        let summary = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0), COUNT(DISTINCT category), COUNT(*) FROM expenses",
            [],
            |row| {
                Ok(DashboardSummary {
                    total_spent: row.get(0)?,
                    category_count: row.get(1)?,
                    expense_count: row.get(2)?,
                })
            },
        )?;

        Ok(summary)
    }
}
