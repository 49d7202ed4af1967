//! Expense handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::debug;

use crate::{get_user, AppError, AppState};
use digifin_core::{Expense, NewExpense};

/// GET /api/expenses - List all expenses in insertion order
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Expense>>, AppError> {
    let user = get_user(&headers);
    let expenses = state.db.list_expenses()?;

    state.db.log_audit(
        &user,
        "list",
        Some("expense"),
        None,
        Some(&format!("count={}", expenses.len())),
    )?;

    Ok(Json(expenses))
}

/// POST /api/expenses - Record a new expense
///
/// Malformed bodies (including dates that are not YYYY-MM-DD) and failed
/// validation both come back as 400.
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<NewExpense>, JsonRejection>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let user = get_user(&headers);
    let Json(new_expense) = body.map_err(|e| AppError::bad_request(&e.body_text()))?;

    let expense = state
        .db
        .insert_expense(&new_expense)
        .map_err(AppError::from_core)?;

    debug!(id = expense.id, user = %user, "Created expense");

    state.db.log_audit(
        &user,
        "create",
        Some("expense"),
        Some(expense.id),
        Some(&format!("{} {}", expense.item, expense.amount)),
    )?;

    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /api/expenses/:id - Get a single expense
pub async fn get_expense(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Expense>, AppError> {
    let user = get_user(&headers);
    let expense = state
        .db
        .get_expense(id)?
        .ok_or_else(|| AppError::not_found("Expense not found"))?;

    state
        .db
        .log_audit(&user, "view", Some("expense"), Some(id), None)?;

    Ok(Json(expense))
}

/// DELETE /api/expenses/:id - Delete an expense
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = get_user(&headers);

    if !state.db.delete_expense(id)? {
        return Err(AppError::not_found("Expense not found"));
    }

    state
        .db
        .log_audit(&user, "delete", Some("expense"), Some(id), None)?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}
