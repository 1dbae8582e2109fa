use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{Header, AUTHORIZATION},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use futures::future::LocalBoxFuture;

use crate::{
    auth::{jwt::INVALID_TOKEN, Claims, JwtService},
    errors::{AppError, AppResult},
    repositories::UserRepository,
};

pub const NO_TOKEN: &str = "No token provided";
pub const USER_INACTIVE: &str = "User not found or inactive";

/// Why a bearer token was rejected. Stored in request extensions so that
/// only routes that require a user turn it into a 401.
#[derive(Debug, Clone)]
pub struct AuthFailure(pub String);

/// Resolves an optional bearer token into [`Claims`]. Requests without a
/// token pass through untouched.
#[derive(Clone)]
pub struct AuthMiddleware {
    jwt_service: Arc<JwtService>,
    users: Arc<dyn UserRepository>,
}

impl AuthMiddleware {
    pub fn new(jwt_service: Arc<JwtService>, users: Arc<dyn UserRepository>) -> Self {
        Self { jwt_service, users }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_service: Arc::clone(&self.jwt_service),
            users: Arc::clone(&self.users),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_service: Arc<JwtService>,
    users: Arc<dyn UserRepository>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        let service = Rc::clone(&self.service);
        let jwt_service = Arc::clone(&self.jwt_service);
        let users = Arc::clone(&self.users);

        Box::pin(async move {
            if req.headers().contains_key(AUTHORIZATION) {
                let token = Authorization::<Bearer>::parse(&req)
                    .map(|auth| auth.into_scheme().token().to_string());

                let outcome = match token {
                    Ok(token) => authenticate(&jwt_service, users.as_ref(), &token).await?,
                    Err(_) => Err(AuthFailure(INVALID_TOKEN.to_string())),
                };

                match outcome {
                    Ok(claims) => {
                        req.extensions_mut().insert(claims);
                    }
                    Err(failure) => {
                        log::debug!("Rejected bearer token: {}", failure.0);
                        req.extensions_mut().insert(failure);
                    }
                }
            }

            service.call(req).await
        })
    }
}

/// Outer `Err` is an infrastructure failure, inner `Err` a rejected token.
async fn authenticate(
    jwt_service: &JwtService,
    users: &dyn UserRepository,
    token: &str,
) -> AppResult<Result<Claims, AuthFailure>> {
    let claims = match jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(err) => return Ok(Err(AuthFailure(err.message()))),
    };

    match users.find_by_user_id(&claims.sub).await? {
        Some(user) if user.is_active() => Ok(Ok(claims)),
        _ => Ok(Err(AuthFailure(USER_INACTIVE.to_string()))),
    }
}

/// Extractor for routes that require a signed-in user.
pub struct AuthenticatedUser(pub Claims);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let extensions = req.extensions();
        let result = match extensions.get::<Claims>() {
            Some(claims) => Ok(AuthenticatedUser(claims.clone())),
            None => {
                let reason = extensions
                    .get::<AuthFailure>()
                    .map(|failure| failure.0.clone())
                    .unwrap_or_else(|| NO_TOKEN.to_string());
                Err(AppError::Unauthorized(reason))
            }
        };

        ready(result)
    }
}

/// Extractor for public routes that behave differently for signed-in users.
pub struct OptionalUser(pub Option<Claims>);

impl FromRequest for OptionalUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalUser(req.extensions().get::<Claims>().cloned())))
    }
}
