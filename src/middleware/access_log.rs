//! Access-log capture middleware
//!
//! Builds a request descriptor for every inbound request and hands it to the
//! ingestion pipeline after the response is produced. The hand-off is
//! fire-and-forget: nothing in here can fail the request or add more than
//! the cost of scheduling one write.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use std::{
    future::{ready, Future, Ready},
    pin::Pin,
    rc::Rc,
    time::Instant,
};

use crate::middleware::auth::{extract_client_ip, AuthenticatedClaims};
use crate::models::CreateAccessLog;
use crate::services::AccessLogIngestor;

/// Middleware factory wiring request capture to an ingestor handle.
pub struct AccessLogCapture {
    ingestor: AccessLogIngestor,
}

impl AccessLogCapture {
    pub fn new(ingestor: AccessLogIngestor) -> Self {
        Self { ingestor }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessLogCapture
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AccessLogCaptureService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessLogCaptureService {
            service: Rc::new(service),
            ingestor: self.ingestor.clone(),
        }))
    }
}

pub struct AccessLogCaptureService<S> {
    service: Rc<S>,
    ingestor: AccessLogIngestor,
}

impl<S, B> Service<ServiceRequest> for AccessLogCaptureService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let ingestor = self.ingestor.clone();
        let started = Instant::now();

        let ip = extract_client_ip(req.request());
        let method = req.method().to_string();
        let url = req.uri().to_string();
        let path = req.path().to_string();
        let user_agent = header_string(&req, header::USER_AGENT);
        let referer = header_string(&req, header::REFERER);

        // Cheap handle sharing the request's extensions; keeps claims
        // readable even when the call fails before producing a response.
        let http_req = req.request().clone();

        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed_ms = started.elapsed().as_millis() as i64;

            let mut record = CreateAccessLog::new(method, url, path)
                .with_ip(ip)
                .with_response_time(elapsed_ms)
                .with_user_agent(user_agent)
                .with_referer(referer);

            if let Some(claims) = http_req.extensions().get::<AuthenticatedClaims>() {
                record = record
                    .with_tenant(claims.0.tenant_id.clone())
                    .with_user(Some(claims.0.sub.to_string()));
            }

            match &result {
                Ok(res) => {
                    record = record.with_status(res.status().as_u16() as i32);
                    if let Some(err) = res.response().error() {
                        record = record.with_error(Some(err.to_string()));
                    }
                }
                Err(err) => {
                    // The request never produced a response; record the
                    // error and the status the framework will map it to.
                    record = record
                        .with_status(err.as_response_error().status_code().as_u16() as i32)
                        .with_error(Some(err.to_string()));
                }
            }

            ingestor.log(record);
            result
        })
    }
}

fn header_string(req: &ServiceRequest, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};
    use tokio::sync::mpsc;

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn teapot_handler() -> HttpResponse {
        HttpResponse::ImATeapot().finish()
    }

    #[actix_rt::test]
    async fn test_capture_records_request() {
        let (tx, mut rx) = mpsc::channel(4);
        let ingestor = AccessLogIngestor::with_sender(tx);

        let app = test::init_service(
            App::new()
                .wrap(AccessLogCapture::new(ingestor))
                .route("/v1/widgets", web::get().to(ok_handler)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/v1/widgets?page=2")
            .insert_header(("X-Forwarded-For", "203.0.113.7"))
            .insert_header((header::USER_AGENT, "curl/8.0"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let record = rx.recv().await.unwrap();
        assert_eq!(record.method, "GET");
        assert_eq!(record.url, "/v1/widgets?page=2");
        assert_eq!(record.path, "/v1/widgets");
        assert_eq!(record.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(record.status_code, Some(200));
        assert_eq!(record.user_agent.as_deref(), Some("curl/8.0"));
        assert!(record.response_time_ms.is_some());
    }

    #[actix_rt::test]
    async fn test_capture_records_error_status() {
        let (tx, mut rx) = mpsc::channel(4);
        let ingestor = AccessLogIngestor::with_sender(tx);

        let app = test::init_service(
            App::new()
                .wrap(AccessLogCapture::new(ingestor))
                .route("/brew", web::get().to(teapot_handler)),
        )
        .await;

        let req = test::TestRequest::get().uri("/brew").to_request();
        let _ = test::call_service(&app, req).await;

        let record = rx.recv().await.unwrap();
        assert_eq!(record.status_code, Some(418));
    }

    #[actix_rt::test]
    async fn test_capture_attributes_authenticated_actor() {
        use crate::services::jwt::AccessTokenClaims;
        use actix_web::HttpRequest;
        use uuid::Uuid;

        let sub = Uuid::new_v4();
        let claims = AccessTokenClaims {
            sub,
            tenant_id: Some("t_9".to_string()),
            role: "admin".to_string(),
            iat: 0,
            exp: i64::MAX,
            jti: "at_test".to_string(),
            iss: "sentra".to_string(),
        };

        // Stands in for the auth extractor, which stashes verified claims
        // in the request extensions before the handler runs.
        let handler = move |req: HttpRequest| {
            let claims = claims.clone();
            async move {
                req.extensions_mut().insert(AuthenticatedClaims(claims));
                HttpResponse::Ok().finish()
            }
        };

        let (tx, mut rx) = mpsc::channel(4);
        let ingestor = AccessLogIngestor::with_sender(tx);

        let app = test::init_service(
            App::new()
                .wrap(AccessLogCapture::new(ingestor))
                .route("/v1/widgets", web::get().to(handler)),
        )
        .await;

        let req = test::TestRequest::get().uri("/v1/widgets").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let record = rx.recv().await.unwrap();
        assert_eq!(record.tenant_id.as_deref(), Some("t_9"));
        assert_eq!(record.user_id.as_deref(), Some(sub.to_string().as_str()));
    }

    #[actix_rt::test]
    async fn test_capture_survives_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        let ingestor = AccessLogIngestor::with_sender(tx);

        let app = test::init_service(
            App::new()
                .wrap(AccessLogCapture::new(ingestor))
                .route("/v1/widgets", web::get().to(ok_handler)),
        )
        .await;

        // Queue holds one record; subsequent requests still succeed.
        for _ in 0..3 {
            let req = test::TestRequest::get().uri("/v1/widgets").to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }
    }
}
