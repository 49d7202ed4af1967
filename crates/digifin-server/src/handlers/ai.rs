//! Generative backend status

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};
use digifin_core::AIBackend;

#[derive(Debug, Serialize)]
pub struct AiHealth {
    pub configured: bool,
    pub healthy: bool,
    pub host: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

/// GET /api/ai/health - Whether free-form questions can reach a model
pub async fn ai_health(State(state): State<Arc<AppState>>) -> Result<Json<AiHealth>, AppError> {
    let timeout_secs = state.resolver.config().timeout.as_secs();

    let health = match state.resolver.ai() {
        Some(ai) => AiHealth {
            configured: true,
            healthy: ai.health_check().await,
            host: Some(ai.host().to_string()),
            model: Some(ai.model().to_string()),
            timeout_secs,
        },
        None => AiHealth {
            configured: false,
            healthy: false,
            host: None,
            model: None,
            timeout_secs,
        },
    };

    Ok(Json(health))
}
