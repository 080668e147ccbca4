use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::SqlitePool;

use crate::auth::token::{Claims, TokenKeys, TokenType};
use crate::error::AppError;
use crate::models::User;

/// API paths reachable without a bearer token.
const PUBLIC_PATHS: &[&str] = &["/api/register/", "/api/token/", "/api/token/refresh/"];

/// Requires a valid access token on every request in the wrapped scope,
/// except for the registration and token endpoints.
///
/// The token's user must still exist and be active. On success the decoded
/// `Claims` are stored in the request extensions, where `AuthenticatedUser`
/// picks them up. Failures are answered directly with the `AppError` JSON
/// body.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

/// Checks the bearer token and that its user may still sign in.
async fn authenticate(req: &ServiceRequest) -> Result<Claims, AppError> {
    let keys = req
        .app_data::<web::Data<TokenKeys>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("Token keys not configured".into()))?;
    let pool = req
        .app_data::<web::Data<SqlitePool>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("Database pool not configured".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let claims = keys.verify(token, TokenType::Access)?;
    if User::find_active(&pool, claims.sub).await?.is_none() {
        log::debug!("rejected token of missing or inactive user {}", claims.sub);
        return Err(AppError::Unauthorized("User not found or inactive".into()));
    }
    Ok(claims)
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if !PUBLIC_PATHS.contains(&req.path()) {
                match authenticate(&req).await {
                    Ok(claims) => {
                        req.extensions_mut().insert(claims);
                    }
                    Err(err) => return Ok(req.error_response(err).map_into_right_body()),
                }
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}
