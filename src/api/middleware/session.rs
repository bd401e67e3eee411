//! Session middleware
//!
//! Decodes the session token (Bearer header first, then cookie) and attaches
//! the [`SessionIdentity`] to the request. It never rejects: a missing or
//! invalid token leaves the request anonymous, and the guard answers
//! `Unauthenticated` where a session is required.

use std::rc::Rc;
use std::sync::Arc;

use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    dev::{Payload, ServiceRequest, ServiceResponse},
    error::ErrorInternalServerError,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{debug, trace};

use crate::api::AppState;
use crate::api::constants::BEARER_PREFIX;
use crate::api::jwt::JwtService;
use crate::rbac::{AuthorizationGuard, SessionIdentity};

#[derive(Clone)]
pub struct SessionAuth {
    jwt: Arc<JwtService>,
    cookie_name: String,
}

impl SessionAuth {
    pub fn new(jwt: Arc<JwtService>, cookie_name: impl Into<String>) -> Self {
        Self {
            jwt,
            cookie_name: cookie_name.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthMiddleware {
            service: Rc::new(service),
            jwt: self.jwt.clone(),
            cookie_name: self.cookie_name.clone(),
        }))
    }
}

pub struct SessionAuthMiddleware<S> {
    service: Rc<S>,
    jwt: Arc<JwtService>,
    cookie_name: String,
}

impl<S> SessionAuthMiddleware<S> {
    fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix(BEARER_PREFIX))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn identify(&self, req: &ServiceRequest) -> Option<SessionIdentity> {
        let token = Self::extract_bearer_token(req)
            .or_else(|| req.cookie(&self.cookie_name).map(|c| c.value().to_string()))?;

        match self.jwt.validate(&token).and_then(|claims| claims.identity()) {
            Ok(identity) => {
                trace!("Session {} for user {}", identity.session_id, identity.user_id);
                Some(identity)
            }
            Err(e) => {
                debug!("Session token rejected: {}", e);
                None
            }
        }
    }
}

impl<S, B> Service<ServiceRequest> for SessionAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(identity) = self.identify(&req) {
            req.extensions_mut().insert(identity);
        }
        let srv = self.service.clone();
        Box::pin(async move { srv.call(req).await })
    }
}

/// Handlers take an [`AuthorizationGuard`] argument to get the caller's guard
impl FromRequest for AuthorizationGuard {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Err(ErrorInternalServerError("application state missing")));
        };
        let identity = req.extensions().get::<SessionIdentity>().cloned();
        ready(Ok(state.guard_for(identity)))
    }
}
