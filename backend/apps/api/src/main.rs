//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are rendered by the
//! auth crate through `kernel::error::AppError`.

use anyhow::{Context, bail};
use auth::models::{Email, PasswordHash};
use auth::{AuthConfig, PgAuthRepository, SuperAdminConfig, auth_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let auth_config = load_auth_config()?;
    let auth_routes = auth_router(PgAuthRepository::new(pool.clone()), auth_config)?;

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api/auth", auth_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()
        .context("BIND_ADDR must be a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Auth configuration from the environment
///
/// - `AUTH_TOKEN_SECRET`: base64, 32 bytes (random in debug builds if unset)
/// - `AUTH_PASSWORD_PEPPER`: optional
/// - `AUTH_LOCKOUT_MINUTES`: optional, default 30
/// - `SUPER_ADMIN_EMAIL` / `SUPER_ADMIN_PASSWORD_HASH`: optional pair (PHC string)
fn load_auth_config() -> anyhow::Result<AuthConfig> {
    let mut config = match env::var("AUTH_TOKEN_SECRET") {
        Ok(secret_b64) => {
            let secret_bytes = general_purpose::STANDARD
                .decode(secret_b64.trim())
                .context("AUTH_TOKEN_SECRET must be base64")?;
            let secret: [u8; 32] = secret_bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("AUTH_TOKEN_SECRET must decode to 32 bytes"))?;
            AuthConfig {
                token_secret: secret,
                ..AuthConfig::default()
            }
        }
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("AUTH_TOKEN_SECRET not set, using a random secret");
            AuthConfig::default()
        }
        Err(_) => bail!("AUTH_TOKEN_SECRET must be set in production"),
    };

    if let Ok(pepper) = env::var("AUTH_PASSWORD_PEPPER") {
        config.argon2 = config.argon2.clone().with_pepper(pepper.into_bytes());
    }

    if let Ok(minutes) = env::var("AUTH_LOCKOUT_MINUTES") {
        let minutes: i64 = minutes
            .parse()
            .context("AUTH_LOCKOUT_MINUTES must be an integer")?;
        config.lockout.lockout_duration = Duration::minutes(minutes);
    }

    match (
        env::var("SUPER_ADMIN_EMAIL"),
        env::var("SUPER_ADMIN_PASSWORD_HASH"),
    ) {
        (Ok(email), Ok(hash)) => {
            config = config.with_super_admin(SuperAdminConfig {
                email: Email::new(email).context("SUPER_ADMIN_EMAIL is invalid")?,
                password_hash: PasswordHash::from_phc_string(hash)
                    .context("SUPER_ADMIN_PASSWORD_HASH must be a PHC string")?,
            });
            tracing::info!("Bootstrap super administrator enabled");
        }
        (Err(_), Err(_)) => {}
        _ => bail!("SUPER_ADMIN_EMAIL and SUPER_ADMIN_PASSWORD_HASH must be set together"),
    }

    Ok(config)
}
