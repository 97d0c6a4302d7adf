pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;

use std::sync::Arc;
use actix_web::{web, HttpResponse};
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

use audit::{AuditSink, FileAuditLog};
use auth::{AuthGateway, BcryptHasher, CredentialVerifier, RateLimiter, TokenService};
use db::{SqliteStorage, Storage};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub storage: Arc<dyn Storage>,
    pub audit: Arc<dyn AuditSink>,
    pub rate_limiter: Arc<RateLimiter>,
    pub credentials: Arc<CredentialVerifier>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Opens the database, runs migrations, starts the audit writer and
    /// provisions any configured seed users.
    pub async fn new(config: Settings) -> Result<Self> {
        let storage = SqliteStorage::connect(&config.database).await?;
        storage.migrate().await?;

        let audit = Arc::new(FileAuditLog::spawn(&config.audit));
        let state = Self::with_components(config, Arc::new(storage), audit)?;

        for user in &state.config.seed_users {
            state.credentials.provision(&user.username, &user.password).await?;
            info!("Provisioned seed user {}", user.username);
        }

        Ok(state)
    }

    pub fn with_components(
        config: Settings,
        storage: Arc<dyn Storage>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        let hasher = Arc::new(BcryptHasher::new(config.auth.bcrypt_cost));

        Ok(Self {
            rate_limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)?),
            credentials: Arc::new(CredentialVerifier::new(storage.clone(), hasher)),
            tokens: Arc::new(TokenService::from_config(&config.auth)?),
            config: Arc::new(config),
            storage,
            audit,
        })
    }

    pub fn auth_gateway(&self) -> AuthGateway {
        AuthGateway::new(self.tokens.clone(), self.audit.clone())
    }
}

/// Registers every route and the shared state on an `App`.
pub fn configure(cfg: &mut web::ServiceConfig, state: web::Data<AppState>) {
    let gateway = state.auth_gateway();

    cfg.app_data(state)
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            AppError::ValidationError(err.to_string()).into()
        }))
        .route("/health", web::get().to(health_check))
        .route("/api/login", web::post().to(auth::handlers::login))
        .service(
            web::scope("/api/feed")
                .wrap(gateway)
                .route("", web::get().to(feed::handlers::get_feed))
                .route("", web::post().to(feed::handlers::post_feed)),
        );
}
