// identity-server/src/middleware/rate_limiter.rs
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, StatusCode},
    Error, HttpResponse, ResponseError,
};
use dashmap::DashMap;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

const RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

#[derive(Debug)]
struct RateLimitExceeded {
    retry_after: u64,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, self.retry_after.to_string()))
            .body("Rate limit exceeded. Please try again later.")
    }
}

/// Sliding-window request limiter keyed by client IP
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    store: Arc<DashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_requests: usize) -> Self {
        Self {
            paths,
            max_requests,
            window: Duration::from_secs(RATE_LIMIT_WINDOW_SECONDS),
            store: Arc::new(DashMap::new()),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    fn applies_to(&self, path: &str) -> bool {
        self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    fn is_rate_limited(&self, ip: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.store.entry(ip.to_string()).or_default();

        hits.retain(|time| now.duration_since(*time) < self.window);

        if hits.len() >= self.max_requests {
            true
        } else {
            hits.push(now);
            false
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.limiter.applies_to(req.path()) {
            let ip = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            if self.limiter.is_rate_limited(&ip) {
                tracing::warn!("Rate limit exceeded for IP: {}", ip);
                let retry_after = self.limiter.window.as_secs();
                return Box::pin(async move { Err(RateLimitExceeded { retry_after }.into()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}
