//! Request ID middleware
//!
//! Tags every request with a `req_<uuid>` identifier, stores it in the
//! request extensions for handlers, and echoes it back in the
//! `x-request-id` response header.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identifier attached to each inbound request
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID with "req_" prefix
    pub fn new() -> Self {
        Self(format!("req_{}", Uuid::new_v4().as_simple()))
    }

    /// Header form of the ID. The ID is plain ASCII, so conversion cannot
    /// fail in practice.
    fn to_header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.0).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
    }
}

/// Middleware that generates and attaches a request ID to each request
pub struct RequestIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestIdService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdService { service }))
    }
}

pub struct RequestIdService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = RequestId::new();
        req.extensions_mut().insert(request_id.clone());

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            res.headers_mut().insert(
                HeaderName::from_static(REQUEST_ID_HEADER),
                request_id.to_header_value(),
            );
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, web, App, HttpResponse};

    #[test]
    fn test_request_id_shape() {
        let id = RequestId::new();
        let hex = id.0.strip_prefix("req_").expect("missing prefix");
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id.0, RequestId::new().0);
    }

    #[actix_rt::test]
    async fn test_response_carries_request_id_header() {
        let app = actix_test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/ping").to_request();
        let resp = actix_test::call_service(&app, req).await;

        let header = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .expect("header missing");
        assert!(header.starts_with("req_"));
    }
}
