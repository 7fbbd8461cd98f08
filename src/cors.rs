use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{header, Method};
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, ready, Ready};
use std::rc::Rc;

pub const ALLOW_METHODS: &str = "GET, HEAD, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With, Accept";
pub const MAX_AGE_SECS: u32 = 86400;

/// Permissive cross-origin headers on every response. Preflight (`OPTIONS`)
/// requests are answered here with an empty 204 and never reach a handler.
#[derive(Clone)]
pub struct CorsHeaders {
    pub allow_origin: String,
}

impl Default for CorsHeaders {
    fn default() -> Self {
        Self { allow_origin: "*".into() }
    }
}

impl CorsHeaders {
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    fn apply(&self, headers: &mut header::HeaderMap) {
        let origin = header::HeaderValue::from_str(&self.allow_origin)
            .unwrap_or_else(|_| header::HeaderValue::from_static("*"));
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, header::HeaderValue::from_static(ALLOW_METHODS));
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, header::HeaderValue::from_static(ALLOW_HEADERS));
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, header::HeaderValue::from(MAX_AGE_SECS));
    }
}

impl<S, B> Transform<S, ServiceRequest> for CorsHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CorsHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorsHeadersMiddleware {
            service: Rc::new(service),
            cfg: self.clone(),
        }))
    }
}

pub struct CorsHeadersMiddleware<S> {
    service: Rc<S>,
    cfg: CorsHeaders,
}

impl<S, B> Service<ServiceRequest> for CorsHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let cfg = self.cfg.clone();
        if *req.method() == Method::OPTIONS {
            let mut res = req.into_response(HttpResponse::NoContent().finish()).map_into_right_body();
            cfg.apply(res.headers_mut());
            return Box::pin(async move { Ok(res) });
        }
        let svc = self.service.clone();
        Box::pin(async move {
            let mut res = svc.call(req).await?.map_into_left_body();
            cfg.apply(res.headers_mut());
            Ok(res)
        })
    }
}
