//! Turns a panic inside a request handler into a `500` response.
//!
//! Without this, actix-web drops the connection of a panicking request.
//! The worker survives either way, but the client deserves a response,
//! and the panic payload should land in the logs.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error,
};
use futures::future::{ready, FutureExt, LocalBoxFuture, Ready};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::AppError;

pub struct CatchPanic;

impl<S, B> Transform<S, ServiceRequest> for CatchPanic
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = CatchPanicService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CatchPanicService { service }))
    }
}

pub struct CatchPanicService<S> {
    service: S,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

fn internal_error(method: &Method, path: &str, payload: Box<dyn Any + Send>) -> Error {
    log::error!(
        "panic while handling {} {}: {}",
        method,
        path,
        panic_message(payload.as_ref())
    );
    AppError::InternalServerError("Internal Server Error".into()).into()
}

impl<S, B> Service<ServiceRequest> for CatchPanicService<S>
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
        // Owned copies only: routing needs the request's inner Rc to be unique.
        let method = req.method().clone();
        let path = req.path().to_owned();

        // Some services do work before returning their future.
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req))) {
            Ok(fut) => fut,
            Err(payload) => return Box::pin(ready(Err(internal_error(&method, &path, payload)))),
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(internal_error(&method, &path, payload)),
            }
        })
    }
}
