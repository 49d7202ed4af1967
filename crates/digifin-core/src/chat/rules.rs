//! Keyword rules answered locally from the expense snapshot

use crate::models::Expense;

use super::{CategoryMatch, ResolverConfig};

/// Computes a reply from the snapshot
pub type Answer = fn(&[Expense], &ResolverConfig) -> String;

/// One keyword-triggered deterministic handler
#[derive(Clone)]
pub struct Rule {
    pub name: &'static str,
    /// Lowercase keyword matched as a substring of the lowercased query
    pub keyword: &'static str,
    answer: Answer,
}

impl Rule {
    pub fn new(name: &'static str, keyword: &'static str, answer: Answer) -> Self {
        Self {
            name,
            keyword,
            answer,
        }
    }

    /// `lowered_query` must already be lowercase
    pub fn matches(&self, lowered_query: &str) -> bool {
        lowered_query.contains(self.keyword)
    }

    pub fn answer(&self, expenses: &[Expense], config: &ResolverConfig) -> String {
        (self.answer)(expenses, config)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("keyword", &self.keyword)
            .finish()
    }
}

/// Built-in rules in priority order
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new("total", "total", answer_total),
        Rule::new("highest", "highest", answer_highest),
        Rule::new("average", "average", answer_average),
        Rule::new("food", "food", answer_food),
    ]
}

/// Render an amount the way it was entered: `7`, `7.5`, `0.1`
///
/// No rounding, no separators. Negative zero prints as `0`.
pub fn format_amount(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

fn sum(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

fn answer_total(expenses: &[Expense], config: &ResolverConfig) -> String {
    format!(
        "💰 Your total spending is {}{}",
        config.currency_symbol,
        format_amount(sum(expenses))
    )
}

fn answer_highest(expenses: &[Expense], config: &ResolverConfig) -> String {
    // First record wins ties
    let highest = expenses.iter().fold(None::<&Expense>, |best, e| match best {
        Some(b) if b.amount >= e.amount => Some(b),
        _ => Some(e),
    });

    match highest {
        Some(e) => format!(
            "📈 Highest expense: {} — {}{}",
            e.item,
            config.currency_symbol,
            format_amount(e.amount)
        ),
        None => "No expenses yet.".to_string(),
    }
}

fn answer_average(expenses: &[Expense], config: &ResolverConfig) -> String {
    let average = if expenses.is_empty() {
        "0".to_string()
    } else {
        format!("{:.2}", sum(expenses) / expenses.len() as f64)
    };
    format!(
        "📊 Your average expense is {}{}",
        config.currency_symbol, average
    )
}

fn answer_food(expenses: &[Expense], config: &ResolverConfig) -> String {
    let food: f64 = expenses
        .iter()
        .filter(|e| match config.food_match {
            CategoryMatch::Exact => e.category == "Food",
            CategoryMatch::IgnoreCase => e.category.to_lowercase() == "food",
        })
        .map(|e| e.amount)
        .sum();

    format!(
        "🍔 You spent {}{} on Food.",
        config.currency_symbol,
        format_amount(food)
    )
}
