//! Axum demo for session-locator
//!
//! Wires the reconciler into a small Axum app: logging in opens a tracked
//! session bound to the cookie session, `/activity` re-checks the network
//! origin of that session and `/logout` closes it.
//!
//! # Running the demo
//!
//! 1. Optionally point `DATABASE_URL` at a database (defaults to in-memory SQLite)
//! 2. Optionally set `IPQS_API_KEY` to enable VPN detection and
//!    `GEOIP_CITY_DB` to enable the offline fallback
//! 3. Run:
//!    ```bash
//!    cargo run --example axum_demo
//!    ```
//!
//! # Trying it out
//!
//! ```bash
//! curl -c cookies.txt -X POST "http://127.0.0.1:3000/login?user_id=alice"
//! curl -b cookies.txt -H "X-Forwarded-For: 185.65.1.1" -X POST http://127.0.0.1:3000/activity
//! curl -b cookies.txt -X POST http://127.0.0.1:3000/logout
//! ```

use std::{env, net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use dotenvy::dotenv;
use sea_orm::Database;
use serde::Deserialize;
use session_locator::migration::{Migrator, MigratorTrait};
use session_locator::{net, token, ActivityOutcome, Reconciler, ReconcilerConfig, SeaOrmStore};
use time::Duration as TimeDuration;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USER_KEY: &str = "user_id";

type AppState = Arc<Reconciler<SeaOrmStore>>;

#[derive(Deserialize)]
struct LoginQuery {
    user_id: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    dotenv().ok();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    info!("Connecting to database: {}", database_url);

    let db = Database::connect(&database_url).await?;
    Migrator::up(&db, None).await?;

    let config = ReconcilerConfig::from_env()?;
    let reconciler = Reconciler::from_config(SeaOrmStore::new(db), &config)?;

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(TimeDuration::hours(24)));

    let app = Router::new()
        .route("/login", post(login))
        .route("/activity", post(activity))
        .route("/logout", post(logout))
        .with_state(Arc::new(reconciler))
        .layer(session_layer);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("Server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn origin_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    net::client_ip(headers, Some(peer.ip())).unwrap_or_else(|| peer.ip().to_string())
}

async fn login(
    State(reconciler): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    session: Session,
    Query(params): Query<LoginQuery>,
) -> impl IntoResponse {
    let ip = origin_ip(&headers, peer);
    let user_agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok());

    if let Err(e) = session.insert(USER_KEY, &params.user_id).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to store user: {}", e),
        );
    }

    // Location tracking never blocks the login itself
    let Some(outcome) = reconciler
        .reconcile_on_login(&params.user_id, &ip, user_agent)
        .await
    else {
        return (StatusCode::OK, format!("Logged in as {} (untracked)", params.user_id));
    };

    if let Err(e) = token::remember(&session, &outcome.session.id).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to bind session: {}", e),
        );
    }

    let location = outcome.location.value();
    (
        StatusCode::OK,
        format!(
            "Logged in as {} from {}, {} (vpn: {})",
            params.user_id,
            location.city,
            location.country,
            outcome.session.is_vpn_detected()
        ),
    )
}

async fn activity(
    State(reconciler): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    session: Session,
) -> impl IntoResponse {
    let ip = origin_ip(&headers, peer);

    let user_id: Option<String> = session.get(USER_KEY).await.unwrap_or(None);
    let tracked = token::recall(&session).await.unwrap_or(None);
    let (Some(user_id), Some(tracked)) = (user_id, tracked) else {
        return (StatusCode::UNAUTHORIZED, "Not logged in".to_string());
    };

    match reconciler.reconcile_session(&user_id, &tracked, &ip).await {
        Some(ActivityOutcome::Reconciled(summary)) => (
            StatusCode::OK,
            format!(
                "ip changed: {}, status changed: {}, vpn: {} ({})",
                summary.ip_changed,
                summary.vpn_status_changed,
                summary.new_status.is_vpn,
                summary.new_status.provider.as_deref().unwrap_or("unknown provider")
            ),
        ),
        Some(ActivityOutcome::NoActiveSession) => {
            (StatusCode::NOT_FOUND, "No active session".to_string())
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Activity check failed".to_string(),
        ),
    }
}

async fn logout(State(reconciler): State<AppState>, session: Session) -> impl IntoResponse {
    if let Ok(Some(tracked)) = token::forget(&session).await {
        if let Err(e) = reconciler.end_session(&tracked).await {
            tracing::warn!(error = %e, "failed to close tracked session");
        }
    }

    match session.flush().await {
        Ok(_) => (StatusCode::OK, "Logged out".to_string()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to clear session: {}", e),
        ),
    }
}
