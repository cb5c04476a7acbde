//! Request-pipeline enforcement.
//!
//! [`authenticate`] validates the bearer token and stores the [`Principal`]
//! in request extensions. [`RequirePermission`] is attached per route method
//! and consults the registered policy before the handler runs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use super::evaluator::{Decision, PermissionPolicy, PolicyRegistry};
use super::permission::Permission;
use super::principal::Principal;
use crate::app::AppState;
use crate::errors::AppError;
use crate::session::bearer_token;

/// Authentication middleware - rejects requests without a valid session token
///
/// Signature, expiry, issuer and audience are checked here, so everything
/// behind it can trust the token's claims.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let token = bearer_token(req.headers()).ok_or_else(|| {
        tracing::debug!(path = %req.uri().path(), "missing bearer token");
        AppError::unauthorized("authentication required")
    })?;

    let claims = state.jwt.decode(token).map_err(|err| {
        tracing::info!(path = %req.uri().path(), "rejected session token");
        err
    })?;
    let principal = Principal::try_from(claims)?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

impl PolicyRegistry {
    /// Layer enforcing the registered policy for `permission`.
    pub fn require(&self, permission: Permission) -> RequirePermission {
        RequirePermission {
            policy: self.policy(permission),
        }
    }
}

/// Layer binding one route method to the policy of its required permission.
#[derive(Clone)]
pub struct RequirePermission {
    policy: Arc<PermissionPolicy>,
}

impl<S> Layer<S> for RequirePermission {
    type Service = RequirePermissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionService {
            inner,
            policy: Arc::clone(&self.policy),
        }
    }
}

#[derive(Clone)]
pub struct RequirePermissionService<S> {
    inner: S,
    policy: Arc<PermissionPolicy>,
}

impl<S> Service<Request<Body>> for RequirePermissionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let policy = Arc::clone(&self.policy);
        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let principal = req.extensions().get::<Principal>().cloned();

            match policy.evaluate(principal.as_ref()).await {
                Decision::Allow => inner.call(req).await,
                Decision::Unauthenticated => Ok(AppError::unauthorized("authentication required").into_response()),
                Decision::Forbidden => {
                    Ok(AppError::forbidden(format!("missing permission {}", policy.permission())).into_response())
                }
            }
        })
    }
}
