//! CLI command tests

use std::io::Cursor;

use chrono::NaiveDate;
use digifin_core::chat::{FALLBACK_REPLY, GREETING};
use digifin_core::db::Database;
use digifin_core::{AIClient, MockBackend, NewExpense, QueryResolver, ResolverConfig};

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn add(db: &Database, item: &str, amount: f64, category: &str) {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    db.insert_expense(&NewExpense::new(item, amount, category, date))
        .unwrap();
}

fn offline_resolver() -> QueryResolver {
    QueryResolver::new(None, ResolverConfig::default())
}

async fn chat_output(db: &Database, resolver: &QueryResolver, input: &str) -> String {
    let mut out = Vec::new();
    commands::run_chat(db, resolver, Cursor::new(input.to_string()), &mut out)
        .await
        .unwrap();
    String::from_utf8(out).unwrap()
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Coffee", 10), "Coffee");
    assert_eq!(truncate("A very long item name", 10), "A very ...");
    assert_eq!(truncate("₹₹₹₹₹₹₹₹₹₹₹₹", 6), "₹₹₹...");
}

#[test]
fn test_parse_date() {
    assert_eq!(
        commands::parse_date("2024-03-05").unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    );
    assert!(commands::parse_date("05/03/2024").is_err());
    assert!(commands::parse_date("").is_err());
}

// ========== Database Setup Tests ==========

#[test]
fn test_open_db_unencrypted_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digifin.db");

    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());

    let db = commands::open_db(&path, true).unwrap();
    assert_eq!(db.count_expenses().unwrap(), 0);
    assert!(!db.is_encrypted());
}

#[test]
fn test_open_db_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digifin.db");

    {
        let db = commands::open_db(&path, true).unwrap();
        commands::cmd_add(&db, "Coffee", 5.0, "Food", None, "2024-01-01").unwrap();
    }

    let db = commands::open_db(&path, true).unwrap();
    assert_eq!(db.count_expenses().unwrap(), 1);
}

// ========== Expense Command Tests ==========

#[test]
fn test_cmd_add_stores_expense() {
    let db = setup_test_db();
    commands::cmd_add(&db, "Lunch", 120.5, "Food", Some("with team"), "2024-02-10").unwrap();

    let expenses = db.list_expenses().unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].item, "Lunch");
    assert_eq!(expenses[0].amount, 120.5);
    assert_eq!(expenses[0].note.as_deref(), Some("with team"));
    assert_eq!(
        expenses[0].date,
        NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
    );
}

#[test]
fn test_cmd_add_rejects_bad_input() {
    let db = setup_test_db();

    assert!(commands::cmd_add(&db, "Lunch", 10.0, "Food", None, "yesterday").is_err());
    assert!(commands::cmd_add(&db, "", 10.0, "Food", None, "2024-01-01").is_err());
    assert!(commands::cmd_add(&db, "Lunch", -1.0, "Food", None, "2024-01-01").is_err());
    assert!(commands::cmd_add(&db, "Lunch", 10.0, "  ", None, "2024-01-01").is_err());

    assert_eq!(db.count_expenses().unwrap(), 0);
}

#[test]
fn test_cmd_list() {
    let db = setup_test_db();
    assert!(commands::cmd_list(&db, false).is_ok());

    add(&db, "Coffee", 5.0, "Food");
    assert!(commands::cmd_list(&db, false).is_ok());
    assert!(commands::cmd_list(&db, true).is_ok());
}

#[test]
fn test_cmd_delete() {
    let db = setup_test_db();
    add(&db, "Coffee", 5.0, "Food");
    let id = db.list_expenses().unwrap()[0].id;

    commands::cmd_delete(&db, id).unwrap();
    assert_eq!(db.count_expenses().unwrap(), 0);

    assert!(commands::cmd_delete(&db, id).is_err());
}

// ========== Report Command Tests ==========

#[test]
fn test_reports_empty_and_populated() {
    let db = setup_test_db();
    assert!(commands::cmd_report_by_category(&db, false).is_ok());
    assert!(commands::cmd_report_over_time(&db, false).is_ok());
    assert!(commands::cmd_report_summary(&db, false).is_ok());

    add(&db, "Coffee", 5.0, "Food");
    add(&db, "Taxi", 20.0, "Travel");

    for json in [false, true] {
        assert!(commands::cmd_report_by_category(&db, json).is_ok());
        assert!(commands::cmd_report_over_time(&db, json).is_ok());
        assert!(commands::cmd_report_summary(&db, json).is_ok());
    }
}

// ========== Chat Command Tests ==========

#[tokio::test]
async fn test_cmd_ask() {
    let db = setup_test_db();
    add(&db, "Coffee", 5.0, "Food");

    assert!(commands::cmd_ask(&db, &offline_resolver(), "total?").await.is_ok());
    assert!(commands::cmd_ask(&db, &offline_resolver(), "   ").await.is_err());
}

#[tokio::test]
async fn test_run_chat_answers_each_line() {
    let db = setup_test_db();
    add(&db, "Coffee", 50.0, "Food");
    add(&db, "Taxi", 200.0, "Travel");

    let output = chat_output(&db, &offline_resolver(), "total\nhighest\n").await;

    assert!(output.starts_with(GREETING));
    assert!(output.contains("💰 Your total spending is ₹250"));
    assert!(output.contains("📈 Highest expense: Taxi — ₹200"));
    assert!(output.trim_end().ends_with("👋 Bye!"));
}

#[tokio::test]
async fn test_run_chat_stops_at_exit_and_skips_blank_lines() {
    let db = setup_test_db();
    add(&db, "Coffee", 5.0, "Food");

    let output = chat_output(&db, &offline_resolver(), "\n   \nexit\ntotal\n").await;

    assert!(!output.contains("Your total spending"));
    assert!(output.contains("👋 Bye!"));
}

#[tokio::test]
async fn test_run_chat_sees_new_expenses() {
    let db = setup_test_db();
    let resolver = offline_resolver();

    let before = chat_output(&db, &resolver, "total\n").await;
    assert!(before.contains("💰 Your total spending is ₹0"));

    add(&db, "Groceries", 300.0, "Food");
    let after = chat_output(&db, &resolver, "how much on food\n").await;
    assert!(after.contains("🍔 You spent ₹300 on Food."));
}

#[tokio::test]
async fn test_run_chat_fallback() {
    let db = setup_test_db();

    let offline = chat_output(&db, &offline_resolver(), "¿Cuánto gasté en taxis?\n").await;
    assert!(offline.contains(FALLBACK_REPLY));

    let mock = MockBackend::new().with_reply("Gastaste ₹0 en taxis.");
    let resolver = QueryResolver::new(Some(AIClient::Mock(mock)), ResolverConfig::default());
    let online = chat_output(&db, &resolver, "¿Cuánto gasté en taxis?\n").await;
    assert!(online.contains("Gastaste ₹0 en taxis."));
}
