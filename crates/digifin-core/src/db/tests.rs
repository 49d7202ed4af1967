//! Database tests

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use super::*;
use crate::models::*;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn seed(db: &Database) -> (Expense, Expense) {
    let coffee = db
        .insert_expense(&NewExpense::new("Coffee", 5.0, "Food", date("2024-01-01")))
        .unwrap();
    let bus = db
        .insert_expense(&NewExpense::new("Bus", 2.0, "Travel", date("2024-01-02")))
        .unwrap();
    (coffee, bus)
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_expenses().unwrap().is_empty());
    assert_eq!(db.count_expenses().unwrap(), 0);
}

#[test]
fn test_encryption_flag_follows_how_db_was_opened() {
    let plain = Database::in_memory().unwrap();
    assert!(!plain.is_encrypted());

    let path = std::env::temp_dir().join(format!("digifin_keyed_{}.db", std::process::id()));
    let path = path.to_string_lossy().to_string();
    let _ = std::fs::remove_file(&path);

    let keyed = Database::new_with_key(&path, Some("correct horse")).unwrap();
    assert!(keyed.is_encrypted());
    keyed
        .insert_expense(&NewExpense::new("Coffee", 5.0, "Food", date("2024-01-01")))
        .unwrap();
    assert_eq!(keyed.count_expenses().unwrap(), 1);
    drop(keyed);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_expenses_schema_exists() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    let result: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('expenses') WHERE name IN ('id', 'item', 'amount', 'category', 'note', 'date', 'created_at')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(result, 7, "expenses table should have 7 expected columns");
}

#[test]
fn test_insert_and_list_expenses() {
    let db = Database::in_memory().unwrap();
    let (coffee, bus) = seed(&db);

    assert!(coffee.id > 0);
    assert_eq!(coffee.item, "Coffee");
    assert_eq!(coffee.date, date("2024-01-01"));

    let expenses = db.list_expenses().unwrap();
    assert_eq!(expenses.len(), 2);
    // Insertion order
    assert_eq!(expenses[0].id, coffee.id);
    assert_eq!(expenses[1].id, bus.id);
    assert_eq!(expenses[1].category, "Travel");
}

#[test]
fn test_insert_trims_fields_and_drops_blank_note() {
    let db = Database::in_memory().unwrap();
    let stored = db
        .insert_expense(
            &NewExpense::new("  Lunch ", 12.5, " Food ", date("2024-02-10")).with_note("   "),
        )
        .unwrap();

    assert_eq!(stored.item, "Lunch");
    assert_eq!(stored.category, "Food");
    assert_eq!(stored.note, None);
}

#[test]
fn test_insert_keeps_note() {
    let db = Database::in_memory().unwrap();
    let stored = db
        .insert_expense(
            &NewExpense::new("Lunch", 12.5, "Food", date("2024-02-10")).with_note("team lunch"),
        )
        .unwrap();

    let fetched = db.get_expense(stored.id).unwrap().unwrap();
    assert_eq!(fetched.note.as_deref(), Some("team lunch"));
    assert_eq!(fetched.amount, 12.5);
}

#[test]
fn test_insert_rejects_invalid_expense() {
    let db = Database::in_memory().unwrap();

    let result = db.insert_expense(&NewExpense::new("", 5.0, "Food", date("2024-01-01")));
    assert!(matches!(result, Err(crate::Error::Validation(_))));

    let result = db.insert_expense(&NewExpense::new("Coffee", -1.0, "Food", date("2024-01-01")));
    assert!(matches!(result, Err(crate::Error::Validation(_))));

    // No partial record
    assert_eq!(db.count_expenses().unwrap(), 0);
}

#[test]
fn test_delete_expense() {
    let db = Database::in_memory().unwrap();
    let (coffee, bus) = seed(&db);

    assert!(db.delete_expense(coffee.id).unwrap());
    assert!(db.get_expense(coffee.id).unwrap().is_none());

    let remaining = db.list_expenses().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, bus.id);

    // Deleting again reports nothing removed
    assert!(!db.delete_expense(coffee.id).unwrap());
}

#[test]
fn test_get_missing_expense() {
    let db = Database::in_memory().unwrap();
    assert!(db.get_expense(999).unwrap().is_none());
}

#[test]
fn test_store_trait_roundtrip() {
    let db = Database::in_memory().unwrap();
    let store: &dyn ExpenseStore = &db;

    let added = store
        .add(&NewExpense::new("Book", 20.0, "Education", date("2024-03-01")))
        .unwrap();
    assert_eq!(store.list().unwrap(), vec![added.clone()]);
    assert!(store.remove(added.id).unwrap());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_subscribe_delivers_initial_snapshot_and_updates() {
    let db = Database::in_memory().unwrap();
    seed(&db);

    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = db
        .subscribe_expenses(Box::new(move |expenses: &[Expense]| {
            sink.lock().unwrap().push(expenses.len());
        }))
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![2]);

    let added = db
        .insert_expense(&NewExpense::new("Tea", 3.0, "Food", date("2024-01-03")))
        .unwrap();
    db.delete_expense(added.id).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![2, 3, 2]);

    subscription.unsubscribe();
    db.insert_expense(&NewExpense::new("Tea", 3.0, "Food", date("2024-01-03")))
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![2, 3, 2]);
    assert_eq!(db.subscriber_count(), 0);
}

#[test]
fn test_subscribe_ignores_failed_writes() {
    let db = Database::in_memory().unwrap();
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    let _subscription = db
        .subscribe_expenses(Box::new(move |_: &[Expense]| {
            *counter.lock().unwrap() += 1;
        }))
        .unwrap();

    let _ = db.insert_expense(&NewExpense::new("", 1.0, "Food", date("2024-01-01")));
    db.delete_expense(12345).unwrap();

    // Only the initial snapshot
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn test_subscription_dropped_by_scope() {
    let db = Database::in_memory().unwrap();
    {
        let _subscription = db.subscribe_expenses(Box::new(|_: &[Expense]| {})).unwrap();
        assert_eq!(db.subscriber_count(), 1);
    }
    assert_eq!(db.subscriber_count(), 0);
}

#[test]
fn test_clones_share_subscribers() {
    let db = Database::in_memory().unwrap();
    let other = db.clone();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = db
        .subscribe_expenses(Box::new(move |expenses: &[Expense]| {
            sink.lock().unwrap().push(expenses.len());
        }))
        .unwrap();

    other
        .insert_expense(&NewExpense::new("Tea", 3.0, "Food", date("2024-01-03")))
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
}

#[test]
fn test_concurrent_writers_leave_latest_snapshot() {
    for _ in 0..10 {
        let db = Database::in_memory().unwrap();
        let latest = Arc::new(Mutex::new(Vec::new()));
        let sink = latest.clone();
        let _subscription = db
            .subscribe_expenses(Box::new(move |expenses: &[Expense]| {
                *sink.lock().unwrap() = expenses.iter().map(|e| e.id).collect::<Vec<_>>();
            }))
            .unwrap();

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let db = db.clone();
                std::thread::spawn(move || {
                    for i in 0..20 {
                        let item = format!("item-{}-{}", w, i);
                        db.insert_expense(&NewExpense::new(&item, 1.0, "Food", date("2024-01-01")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let stored: Vec<i64> = db.list_expenses().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(stored.len(), 160);
        assert_eq!(*latest.lock().unwrap(), stored);
    }
}

#[test]
fn test_concurrent_deletes_do_not_resurrect() {
    let db = Database::in_memory().unwrap();
    let ids: Vec<i64> = (0..40)
        .map(|i| {
            db.insert_expense(&NewExpense::new(&format!("item-{}", i), 1.0, "Food", date("2024-01-01")))
                .unwrap()
                .id
        })
        .collect();

    let latest = Arc::new(Mutex::new(usize::MAX));
    let sink = latest.clone();
    let _subscription = db
        .subscribe_expenses(Box::new(move |expenses: &[Expense]| {
            *sink.lock().unwrap() = expenses.len();
        }))
        .unwrap();

    let deleters: Vec<_> = ids
        .chunks(10)
        .map(|chunk| {
            let db = db.clone();
            let chunk = chunk.to_vec();
            std::thread::spawn(move || {
                for id in chunk {
                    assert!(db.delete_expense(id).unwrap());
                }
            })
        })
        .collect();
    for deleter in deleters {
        deleter.join().unwrap();
    }

    assert_eq!(*latest.lock().unwrap(), 0);
}

#[test]
fn test_spending_by_category() {
    let db = Database::in_memory().unwrap();
    seed(&db);
    db.insert_expense(&NewExpense::new("Dinner", 20.0, "Food", date("2024-01-03")))
        .unwrap();
    db.insert_expense(&NewExpense::new("Snack", 1.5, "food", date("2024-01-03")))
        .unwrap();

    let totals = db.spending_by_category().unwrap();
    assert_eq!(totals.len(), 3);
    assert_eq!(totals[0].category, "Food");
    assert_eq!(totals[0].total, 25.0);
    assert_eq!(totals[0].count, 2);
    assert_eq!(totals[1].category, "Travel");
    assert_eq!(totals[2].category, "food");
    assert_eq!(totals[2].total, 1.5);
}

#[test]
fn test_spending_over_time() {
    let db = Database::in_memory().unwrap();
    db.insert_expense(&NewExpense::new("Late", 4.0, "Misc", date("2024-03-05")))
        .unwrap();
    seed(&db);
    db.insert_expense(&NewExpense::new("Tea", 3.0, "Food", date("2024-01-01")))
        .unwrap();

    let totals = db.spending_over_time().unwrap();
    assert_eq!(totals.len(), 3);
    assert_eq!(totals[0].date, date("2024-01-01"));
    assert_eq!(totals[0].total, 8.0);
    assert_eq!(totals[0].count, 2);
    assert_eq!(totals[2].date, date("2024-03-05"));
}

#[test]
fn test_dashboard_summary() {
    let db = Database::in_memory().unwrap();

    let empty = db.dashboard_summary().unwrap();
    assert_eq!(empty.total_spent, 0.0);
    assert_eq!(empty.expense_count, 0);

    seed(&db);
    let summary = db.dashboard_summary().unwrap();
    assert_eq!(summary.total_spent, 7.0);
    assert_eq!(summary.category_count, 2);
    assert_eq!(summary.expense_count, 2);
}

#[test]
fn test_audit_log() {
    let db = Database::in_memory().unwrap();
    db.log_audit("local-dev", "create", Some("expense"), Some(1), Some("Coffee"))
        .unwrap();
    db.log_audit("local-dev", "list", Some("expense"), None, None)
        .unwrap();

    let entries = db.list_audit_log(10).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "list");
    assert_eq!(entries[1].entity_id, Some(1));
    assert_eq!(entries[1].actor, "local-dev");
}

#[test]
fn test_derive_key_is_stable() {
    let a = derive_key("correct horse").unwrap();
    let b = derive_key("correct horse").unwrap();
    let c = derive_key("battery staple").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}
