//! DigiFin Web Server
//!
//! Axum-based REST API for the DigiFin expense tracker.
//!
//! Security features:
//! - API key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (query length, audit page limits)
//! - Full audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::sync::{Arc, RwLock};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use digifin_core::{AIBackend, Database, Expense, QueryResolver, Subscription};

mod handlers;

pub use handlers::ChatSessionManager;

/// Maximum audit log page size
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Maximum chat query length in characters
pub const MAX_QUERY_CHARS: usize = 2000;

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Accepted API keys, sent as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

impl ServerConfig {
    /// Parse a comma-separated key list (as found in `DIGIFIN_API_KEYS`)
    pub fn parse_api_keys(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Latest expense list, kept current by a store subscription
///
/// Chat queries read from here instead of going back to the database.
#[derive(Clone, Default)]
pub struct ExpenseSnapshot {
    inner: Arc<RwLock<Vec<Expense>>>,
}

impl ExpenseSnapshot {
    /// Subscribe to `db` and return the live snapshot plus its subscription
    pub fn follow(db: &Database) -> digifin_core::Result<(Self, Subscription)> {
        let snapshot = Self::default();
        let sink = snapshot.inner.clone();
        let subscription = db.subscribe_expenses(Box::new(move |expenses: &[Expense]| {
            let mut guard = sink.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = expenses.to_vec();
        }))?;
        Ok((snapshot, subscription))
    }

    /// Owned copy of the current list
    pub fn current(&self) -> Vec<Expense> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub resolver: QueryResolver,
    /// Session manager for chat conversations
    pub chat_sessions: ChatSessionManager,
    pub snapshot: ExpenseSnapshot,
    /// Keeps `snapshot` subscribed for the lifetime of the state
    _subscription: Subscription,
}

/// Authentication middleware - validates API keys
///
/// Keys are compared in constant time.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        debug!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        key_bytes.len() == provided_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Identify the caller for audit logging
///
/// Returns "api-key" for API key auth, or "local-dev" for unauthenticated
pub fn get_user(headers: &axum::http::HeaderMap) -> String {
    if headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some()
    {
        return "api-key".to_string();
    }

    "local-dev".to_string()
}

/// Create the application router with a resolver built from the environment
pub fn create_router(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<Router> {
    create_router_with_resolver(db, static_dir, config, QueryResolver::from_env())
}

/// Create the application router with an explicit resolver (for testing)
pub fn create_router_with_resolver(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
    resolver: QueryResolver,
) -> anyhow::Result<Router> {
    match resolver.ai() {
        Some(ai) => info!(host = %ai.host(), model = %ai.model(), "AI backend configured"),
        None => info!("ℹ️  AI backend not configured (set GEMINI_API_KEY to enable free-form answers)"),
    }

    let (snapshot, subscription) = ExpenseSnapshot::follow(&db)?;

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        resolver,
        chat_sessions: ChatSessionManager::new(),
        snapshot,
        _subscription: subscription,
    });

    let api_routes = Router::new()
        // Expenses
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/expenses/:id",
            get(handlers::get_expense).delete(handlers::delete_expense),
        )
        // Dashboard and chart data
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/reports/by-category", get(handlers::report_by_category))
        .route("/reports/over-time", get(handlers::report_over_time))
        // Chatbot
        .route("/chat/query", post(handlers::query_chat))
        .route("/chat/session", post(handlers::create_chat_session))
        .route(
            "/chat/session/:id",
            get(handlers::get_chat_session).delete(handlers::delete_chat_session),
        )
        // AI backend
        .route("/ai/health", get(handlers::ai_health))
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // CSP: same-origin scripts, inline styles for the chart widgets
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    Ok(app)
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        warn!("⚠️  Authentication required but no API keys configured (set DIGIFIN_API_KEYS); every request will be rejected");
    }

    let resolver = QueryResolver::from_env();
    check_ai_connection(&resolver).await;

    let app = create_router_with_resolver(db, static_dir, config, resolver)?;
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(resolver: &QueryResolver) {
    match resolver.ai() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ AI backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("ℹ️  AI backend not configured, unmatched chat queries get the fallback reply");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error, exposing validation messages and hiding the rest
    pub fn from_core(err: digifin_core::Error) -> Self {
        match err {
            digifin_core::Error::Validation(msg) => Self::bad_request(&msg),
            digifin_core::Error::NotFound(msg) => Self::not_found(&msg),
            other => other.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Generic message to the client, full error to the log
            message: "An internal error occurred".to_string(),
            internal: Some(err.into()),
        }
    }
}
