//! Static API key guard for the `/admin` scope.
//!
//! Every request must carry the configured key in the `spg_admin_key` header. This only keeps strangers off the
//! administrative routes. Deciding *which* operator may do what is left to whatever sits in front of the server.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorForbidden,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use spg_common::Secret;

pub const ADMIN_KEY_HEADER: &str = "spg_admin_key";

pub struct AdminKeyMiddlewareFactory {
    key: Secret<String>,
}

impl AdminKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        AdminKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let expected = self.key.reveal().clone();
        Box::pin(async move {
            trace!("🔐️ Checking admin key for {}", req.path());
            let Some(supplied) = req.headers().get(ADMIN_KEY_HEADER) else {
                warn!("🔐️ No admin key in request to {}. Denying access.", req.path());
                return Err(ErrorForbidden("No admin key found."));
            };
            if !expected.is_empty() && supplied.as_bytes() == expected.as_bytes() {
                trace!("🔐️ Admin key check ✅️");
                service.call(req).await
            } else {
                warn!("🔐️ Invalid admin key in request to {}. Denying access.", req.path());
                Err(ErrorForbidden("Invalid admin key."))
            }
        })
    }
}
