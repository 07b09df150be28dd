use std::{
    sync::Arc,
    task::{Context, Poll},
};

use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Request},
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use futures::future::Either;
use headers::{authorization::Bearer, Authorization};
use http::{request::Parts, HeaderMap, StatusCode};
use mcs_types::claim::{ApiClaim, Authorization as _, Role};
use tower::{Layer, Service};
use tracing::debug;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Validates a bearer token when one is present and stashes the claim in
/// request extensions. Anonymous requests pass through untouched - route
/// guards decide what identity is required.
#[derive(Clone)]
pub struct TokenLayer {
    state: AppState,
}

impl TokenLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for TokenLayer {
    type Service = TokenService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TokenService<S> {
    inner: S,
    state: AppState,
}

impl<S> Service<Request> for TokenService<S>
where
    S: Service<Request>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        if let Some(token) = bearer_token(req.headers()) {
            match self.state.tokens().validate::<ApiClaim>(token) {
                Ok(claim) => {
                    req.extensions_mut().insert(claim);
                }
                Err(e) => {
                    debug!("Ignoring invalid bearer token: {e}");
                }
            }
        }
        self.inner.call(req)
    }
}

/// Short-circuits requests whose claim does not carry any of the required
/// roles: 401 for anonymous callers, 403 for insufficient roles. Relies on
/// [`TokenLayer`] having run further out in the stack.
#[derive(Clone)]
pub struct RequiredRolesLayer {
    roles: Arc<Vec<Role>>,
}

impl RequiredRolesLayer {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: Arc::new(roles.into_iter().collect()),
        }
    }
}

impl<S> Layer<S> for RequiredRolesLayer {
    type Service = RequiredRolesService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequiredRolesService {
            inner,
            roles: self.roles.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequiredRolesService<S> {
    inner: S,
    roles: Arc<Vec<Role>>,
}

impl<S> Service<Request> for RequiredRolesService<S>
where
    S: Service<Request, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Either<S::Future, std::future::Ready<Result<Response, S::Error>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let rejection = match req.extensions().get::<ApiClaim>() {
            Some(claim) if claim.has_any_role(self.roles.iter().copied()) => None,
            Some(claim) => {
                debug!("User {} lacks required role", claim.sub);
                Some(StatusCode::FORBIDDEN)
            }
            None => Some(StatusCode::UNAUTHORIZED),
        };
        match rejection {
            None => Either::Left(self.inner.call(req)),
            Some(status) => Either::Right(std::future::ready(Ok(status.into_response()))),
        }
    }
}

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // TokenLayer already did the work on routes mounted under it
        if let Some(claim) = parts.extensions.get::<ApiClaim>() {
            return Ok(claim.clone());
        }

        let header_token = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .ok()
            .map(|h| h.0.token().to_string());

        match header_token {
            Some(token) => {
                let claim = state.tokens().validate::<ApiClaim>(&token).map_err(|e| {
                    debug!("Failed to validate token: {e}");
                    StatusCode::UNAUTHORIZED
                })?;
                Ok(claim)
            }
            None => {
                debug!("No token found");
                Err(StatusCode::UNAUTHORIZED)
            }
        }
    }
}
