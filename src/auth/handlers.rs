use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::AuditSink;
use crate::auth::rate_limit::RateLimitDecision;
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

/// Throttling key for the requesting client.
pub fn client_key(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let client = client_key(&req);

    if state.rate_limiter.check(&client).await == RateLimitDecision::Rejected {
        warn!("Login rate limit exceeded for client {}", client);
        state
            .audit
            .error(format!("Rate limit exceeded for client {} (user: {})", client, body.username));
        return Err(AuthError::RateLimitExceeded.into());
    }

    match state.credentials.verify(&body.username, &body.password).await {
        Ok(identity) => {
            let token = state.tokens.issue(&identity)?;
            info!("Login successful for user {}", identity.username);
            state
                .audit
                .activity(format!("Login successful for: {}", identity.username));
            Ok(HttpResponse::Ok().json(LoginResponse {
                token,
                username: identity.username,
            }))
        }
        Err(AppError::AuthError(AuthError::InvalidCredentials)) => {
            state
                .audit
                .activity(format!("Failed login for: {}", body.username));
            Err(AuthError::InvalidCredentials.into())
        }
        Err(e) => {
            state
                .audit
                .error(format!("Login error for {}: {}", body.username, e));
            Err(e)
        }
    }
}
