use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

use crate::audit::AuditSink;
use crate::auth::token::{Identity, TokenService};
use crate::error::{AppError, AuthError};

/// Bearer-token gate for protected routes.
///
/// Missing token: 401. Invalid or expired token: 403 plus an audit entry.
/// On success the [`Identity`] is stored in the request extensions.
#[derive(Clone)]
pub struct AuthGateway {
    tokens: Arc<TokenService>,
    audit: Arc<dyn AuditSink>,
}

impl AuthGateway {
    pub fn new(tokens: Arc<TokenService>, audit: Arc<dyn AuditSink>) -> Self {
        Self { tokens, audit }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::Unauthenticated)?;
        self.tokens.verify(token).map_err(|e| {
            self.audit.error(format!("Token verification failed: {}", e));
            e
        })
    }
}

/// Extracts `<token>` from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S, B> Transform<S, ServiceRequest> for AuthGateway
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthGatewayService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGatewayService {
            service: Rc::new(service),
            gateway: self.clone(),
        }))
    }
}

pub struct AuthGatewayService<S> {
    service: Rc<S>,
    gateway: AuthGateway,
}

impl<S, B> Service<ServiceRequest> for AuthGatewayService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Signature checks are cheap and synchronous; no need to defer them.
        match self.gateway.authenticate(req.headers()) {
            Ok(identity) => {
                debug!("Authenticated {} for {}", identity.username, req.path());
                req.extensions_mut().insert(identity);
                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                debug!("Rejected request to {}: {}", req.path(), e);
                let error: Error = AppError::from(e).into();
                Box::pin(ready(Err::<ServiceResponse<B>, Error>(error)))
            }
        }
    }
}

impl FromRequest for Identity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Identity>() {
            Some(identity) => ready(Ok(identity.clone())),
            None => ready(Err(AppError::from(AuthError::Unauthenticated).into())),
        }
    }
}
