//! Dashboard and chart data handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};

use crate::{get_user, AppError, AppState};
use digifin_core::{CategoryTotal, DailyTotal, DashboardSummary};

/// GET /api/dashboard - Headline numbers
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardSummary>, AppError> {
    let user = get_user(&headers);
    let summary = state.db.dashboard_summary()?;

    state
        .db
        .log_audit(&user, "view", Some("dashboard"), None, None)?;

    Ok(Json(summary))
}

/// GET /api/reports/by-category - Pie chart data
pub async fn report_by_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CategoryTotal>>, AppError> {
    let user = get_user(&headers);
    let totals = state.db.spending_by_category()?;

    state.db.log_audit(
        &user,
        "report",
        Some("spending_by_category"),
        None,
        Some(&format!("categories={}", totals.len())),
    )?;

    Ok(Json(totals))
}

/// GET /api/reports/over-time - Line chart data
pub async fn report_over_time(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<DailyTotal>>, AppError> {
    let user = get_user(&headers);
    let totals = state.db.spending_over_time()?;

    state.db.log_audit(
        &user,
        "report",
        Some("spending_over_time"),
        None,
        Some(&format!("days={}", totals.len())),
    )?;

    Ok(Json(totals))
}
