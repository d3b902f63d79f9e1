//! Authentication middleware and extractor for Axum

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::application::{AuthorizationGate, Identity};
use crate::shared::Rejection;

/// State shared by the middleware and the [`Authenticated`] extractor
#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<AuthorizationGate>,
}

impl AuthState {
    pub fn new(gate: AuthorizationGate) -> Self {
        Self { gate: Arc::new(gate) }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<Identity, Rejection> {
        let header = headers
            .get(header::AUTHORIZATION)
            .map(|value| value.as_bytes());
        self.gate.authorize_raw(header)
    }
}

/// Bearer-token middleware for protected route groups.
///
/// On success the [`Identity`] lives in the request extensions, so it is
/// dropped together with the request.
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match auth_state.authorize(request.headers()) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Extractor for the caller's verified identity.
///
/// Reuses the identity set by [`auth_middleware`] when present, otherwise
/// runs the gate itself.
///
/// ```rust,ignore
/// async fn handler(Authenticated(identity): Authenticated) -> impl IntoResponse {
///     identity.account_id.to_string()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(Authenticated(identity));
        }

        let auth_state = AuthState::from_ref(state);
        auth_state.authorize(&parts.headers).map(Authenticated)
    }
}
