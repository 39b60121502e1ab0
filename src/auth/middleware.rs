use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::verify_token;
use crate::error::AppError;

/// Routes reachable without a credential: the liveness probe and the two
/// endpoints that mint tokens in the first place.
const OPEN_PATHS: [&str; 3] = ["/health", "/api/auth/login", "/api/auth/register"];

/// Bearer-token gate for every protected route.
///
/// On success the decoded `Claims` land in the request extensions, where
/// `AuthenticatedUser` picks them up; on failure the request is rejected
/// with 401 before any handler runs. The gate never touches application
/// state.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateService { service }))
    }
}

pub struct AuthGateService<S> {
    service: S,
}

/// Pulls the token out of a `Bearer` authorization header, if any.
fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if OPEN_PATHS.iter().any(|open| req.path().starts_with(open)) {
            return Box::pin(self.service.call(req));
        }

        match bearer_token(&req) {
            Some(token) => match verify_token(token) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    Box::pin(self.service.call(req))
                }
                Err(rejection) => Box::pin(async move { Err(rejection.into()) }),
            },
            None => {
                let rejection = AppError::Unauthorized("Missing token".into());
                Box::pin(async move { Err(rejection.into()) })
            }
        }
    }
}
