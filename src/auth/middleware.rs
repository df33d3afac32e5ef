use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web, Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::extractors::AuthenticatedUser;
use crate::auth::token::{TokenEngine, TokenKind};
use crate::error::AppError;

/// Bearer-token gate for protected scopes.
///
/// On success the verified identity is stored in the request extensions as an
/// `AuthenticatedUser`. On failure the inner service is never called and a 401
/// envelope is returned directly. Requires `web::Data<TokenEngine>` in app data.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(user) => {
                log::debug!("authenticated user {} for {}", user.id(), req.path());
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(err) => {
                log::debug!("rejected request to {}: {}", req.path(), err);
                let response = req.into_response(err.error_response()).map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

fn authenticate(req: &ServiceRequest) -> Result<AuthenticatedUser, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::MissingCredential)?
        .to_str()
        .map_err(|_| AppError::MalformedCredential)?;

    let token = parse_bearer(header)?;

    let engine = req
        .app_data::<web::Data<TokenEngine>>()
        .ok_or_else(|| AppError::Internal("token engine is not configured".into()))?;

    let claims = engine.verify_kind(token, TokenKind::Access)?;
    AuthenticatedUser::from_claims(&claims)
}

/// Splits `Bearer <token>` on the first space. The scheme is case-sensitive and the
/// token must be non-empty with no further whitespace.
pub fn parse_bearer(value: &str) -> Result<&str, AppError> {
    match value.split_once(' ') {
        Some(("Bearer", token))
            if !token.is_empty() && !token.contains(char::is_whitespace) =>
        {
            Ok(token)
        }
        _ => Err(AppError::MalformedCredential),
    }
}
