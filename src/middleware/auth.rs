use crate::error::ApiError;
use crate::models::user::Claims;
use crate::utils::auth::{TokenRejection, TokenService};
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderValue, AUTHORIZATION},
    Error, HttpMessage, ResponseError,
};
use chrono::{DateTime, Utc};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;
use tracing::warn;

/// Rejects requests without a valid bearer token and stores the verified
/// [`Claims`] in the request extensions otherwise.
pub struct AuthMiddleware {
    tokens: Arc<TokenService>,
}

impl AuthMiddleware {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        AuthMiddleware { tokens }
    }
}

/// Decides access from the raw `Authorization` header alone.
pub fn authorize(
    header: Option<&HeaderValue>,
    tokens: &TokenService,
    now: DateTime<Utc>,
) -> Result<Claims, TokenRejection> {
    let header = header.ok_or(TokenRejection::MissingHeader)?;
    let header_str = header
        .to_str()
        .map_err(|_| TokenRejection::MalformedHeader)?;
    let token = header_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(TokenRejection::MalformedHeader)?;

    tokens.verify(token, now)
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    tokens: Arc<TokenService>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let decision = authorize(req.headers().get(AUTHORIZATION), &self.tokens, Utc::now());

        let claims = match decision {
            Ok(claims) => claims,
            Err(rejection) => {
                warn!(path = %req.path(), reason = %rejection, "Rejected unauthenticated request");
                let (req, _pl) = req.into_parts();
                let res = ApiError::Unauthenticated(rejection).error_response();
                return Box::pin(async move {
                    Ok(ServiceResponse::new(req, res).map_into_right_body())
                });
            }
        };

        // Insert claims into request extensions
        req.extensions_mut().insert(claims);

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
