//! API Middleware
//!
//! Bearer authentication for Axum. Presented tokens are opaque handles;
//! every request resolves its bearer against the token store, so a block
//! or revoke takes effect on the very next call.

use axum::{
    Json, async_trait,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::shared::error::{ErrorResponse, PlatformError};
use crate::token::{Token, TokenIssuer};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub token_service: Arc<TokenIssuer>,
}

/// Authenticated bearer extractor; resolves and validates the presented
/// access token against the store.
pub struct Authenticated(pub Token);

impl std::ops::Deref for Authenticated {
    type Target = Token;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Error response for authentication failures
pub struct AuthError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn auth_error(err: PlatformError) -> AuthError {
    match err {
        PlatformError::Unauthorized { message } => AuthError {
            status: StatusCode::UNAUTHORIZED,
            message,
        },
        other => {
            tracing::error!(error = %other, "token validation failed");
            AuthError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "internal server error".to_string(),
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // AppState arrives via extensions, set by the auth layer
        let app_state = parts.extensions.get::<AppState>().ok_or_else(|| AuthError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "auth layer not configured".to_string(),
        })?;

        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| AuthError {
                status: StatusCode::UNAUTHORIZED,
                message: "missing bearer token".to_string(),
            })?;

        let token = app_state
            .token_service
            .validate(raw)
            .await
            .map_err(auth_error)?;

        Ok(Authenticated(token))
    }
}

/// Optional bearer extractor; yields `None` instead of rejecting when no
/// valid token is presented.
pub struct OptionalAuth(pub Option<Token>);

impl std::ops::Deref for OptionalAuth {
    type Target = Option<Token>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(app_state) = parts.extensions.get::<AppState>() else {
            return Ok(OptionalAuth(None));
        };

        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token);

        let Some(raw) = raw else {
            return Ok(OptionalAuth(None));
        };

        match app_state.token_service.validate(raw).await {
            Ok(token) => Ok(OptionalAuth(Some(token))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

/// Middleware layer that injects AppState into request extensions so the
/// bearer extractors can reach the token service.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::Layer;
use tower::Service;

#[derive(Clone)]
pub struct AuthLayer {
    state: AppState,
}

impl AuthLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S, B> Service<axum::http::Request<B>> for AuthMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());

        let future = self.inner.call(req);
        Box::pin(async move { future.await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Bearer  abc123 "), Some("abc123"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("abc123"), None);
    }
}
