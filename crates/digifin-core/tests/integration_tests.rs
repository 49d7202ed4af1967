//! Integration tests for digifin-core
//!
//! These tests exercise the full record → subscribe → ask workflow.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use digifin_core::{
    chat::{FALLBACK_REPLY, GREETING},
    AIClient, Database, Expense, ExpenseStore, MockBackend, NewExpense, QueryResolver,
    ReplySource, ResolverConfig, Sender, Transcript,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

/// Keeps the latest snapshot the store pushed, the way the dashboard does
fn live_snapshot(db: &Database) -> (Arc<Mutex<Vec<Expense>>>, digifin_core::Subscription) {
    let snapshot = Arc::new(Mutex::new(Vec::new()));
    let sink = snapshot.clone();
    let subscription = db
        .subscribe_expenses(Box::new(move |expenses: &[Expense]| {
            *sink.lock().unwrap() = expenses.to_vec();
        }))
        .expect("Failed to subscribe");
    (snapshot, subscription)
}

// =============================================================================
// Store + Resolver
// =============================================================================

#[tokio::test]
async fn test_chat_answers_track_store_changes() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let (snapshot, _subscription) = live_snapshot(&db);
    let resolver = QueryResolver::new(None, ResolverConfig::default());

    let current = snapshot.lock().unwrap().clone();
    let res = resolver.resolve("total?", &current).await;
    assert_eq!(res.reply, "💰 Your total spending is ₹0");

    db.insert_expense(&NewExpense::new("Coffee", 5.0, "Food", date("2024-01-01")))
        .unwrap();
    let bus = db
        .insert_expense(&NewExpense::new("Bus", 2.0, "Travel", date("2024-01-02")))
        .unwrap();

    let current = snapshot.lock().unwrap().clone();
    assert_eq!(resolver.resolve("What's my total?", &current).await.reply, "💰 Your total spending is ₹7");
    assert_eq!(
        resolver.resolve("average", &current).await.reply,
        "📊 Your average expense is ₹3.50"
    );

    db.delete_expense(bus.id).unwrap();
    let current = snapshot.lock().unwrap().clone();
    assert_eq!(resolver.resolve("total", &current).await.reply, "💰 Your total spending is ₹5");
}

#[tokio::test]
async fn test_fallback_prompt_carries_store_snapshot() {
    let db = Database::in_memory().unwrap();
    db.add(&NewExpense::new("Rent", 900.0, "Housing", date("2024-02-01")).with_note("February"))
        .unwrap();

    let mock = MockBackend::new().with_reply("Tu gasto más grande fue el alquiler.");
    let resolver = QueryResolver::new(Some(AIClient::Mock(mock.clone())), ResolverConfig::default());

    let expenses = db.list().unwrap();
    let res = resolver
        .resolve("¿Cuál fue mi mayor gasto?", &expenses)
        .await;
    assert_eq!(res.source, ReplySource::Model);
    assert_eq!(res.reply, "Tu gasto más grande fue el alquiler.");

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("¿Cuál fue mi mayor gasto?"));
    assert!(prompts[0].contains("\"note\":\"February\""));
    assert!(prompts[0].contains("\"date\":\"2024-02-01\""));
}

// =============================================================================
// Transcript
// =============================================================================

#[tokio::test]
async fn test_full_conversation() {
    let db = Database::in_memory().unwrap();
    db.insert_expense(&NewExpense::new("Coffee", 5.0, "Food", date("2024-01-01")))
        .unwrap();
    db.insert_expense(&NewExpense::new("Bus", 2.0, "Travel", date("2024-01-02")))
        .unwrap();

    let resolver = QueryResolver::new(
        Some(AIClient::Mock(MockBackend::failing())),
        ResolverConfig::default(),
    );
    let mut transcript = Transcript::new();
    let expenses = db.list_expenses().unwrap();

    assert!(transcript.send(&resolver, "   ", &expenses).await.is_none());
    transcript
        .send(&resolver, "highest expense?", &expenses)
        .await
        .unwrap();
    transcript.send(&resolver, "food spend", &expenses).await.unwrap();
    transcript
        .send(&resolver, "Wie viel habe ich ausgegeben?", &expenses)
        .await
        .unwrap();

    let messages = transcript.messages();
    assert_eq!(messages.len(), 7);
    assert_eq!(messages[0].text, GREETING);
    assert_eq!(messages[2].text, "📈 Highest expense: Coffee — ₹5");
    assert_eq!(messages[4].text, "🍔 You spent ₹5 on Food.");
    assert_eq!(messages[6].text, FALLBACK_REPLY);

    // Strict user/bot alternation after the greeting
    for (i, message) in messages.iter().enumerate().skip(1) {
        let expected = if i % 2 == 1 { Sender::User } else { Sender::Bot };
        assert_eq!(message.sender, expected, "message {} out of order", i);
    }
}

#[tokio::test]
async fn test_validation_failure_leaves_answers_unchanged() {
    let db = Database::in_memory().unwrap();
    db.insert_expense(&NewExpense::new("Coffee", 5.0, "Food", date("2024-01-01")))
        .unwrap();

    assert!(db
        .insert_expense(&NewExpense::new("Refund", -5.0, "Food", date("2024-01-02")))
        .is_err());
    assert!(db
        .insert_expense(&NewExpense::new("Mystery", 3.0, "  ", date("2024-01-02")))
        .is_err());

    let resolver = QueryResolver::new(None, ResolverConfig::default());
    let expenses = db.list_expenses().unwrap();
    assert_eq!(resolver.resolve("total", &expenses).await.reply, "💰 Your total spending is ₹5");
}
