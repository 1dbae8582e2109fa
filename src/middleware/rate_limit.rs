use std::{
    collections::HashMap,
    future::{ready, Ready},
    rc::Rc,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;

use crate::errors::AppError;

pub const TOO_MANY_REQUESTS: &str = "Too many requests, please try again later.";
pub const TOO_MANY_LOGINS: &str = "Too many login attempts, please try again in 1 hour.";

/// Entries are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

/// Fixed-window hit counter keyed by client address.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    window: Duration,
    max: u32,
    hits: Mutex<HashMap<String, (Instant, u32)>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a hit and reports whether the client is still within its budget.
    pub fn hit(&self, key: &str) -> bool {
        self.hit_at(key, Instant::now())
    }

    /// Whether the client has already used up its budget.
    pub fn is_exhausted(&self, key: &str) -> bool {
        self.count_at(key, Instant::now()) >= self.max
    }

    fn hit_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        if hits.len() > SWEEP_THRESHOLD {
            let window = self.window;
            hits.retain(|_, (start, _)| now.duration_since(*start) < window);
        }

        let entry = hits.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;
        entry.1 <= self.max
    }

    /// Hits left in the current window and whole seconds until it resets.
    pub fn quota(&self, key: &str) -> (u32, u64) {
        self.quota_at(key, Instant::now())
    }

    fn quota_at(&self, key: &str, now: Instant) -> (u32, u64) {
        let hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        match hits.get(key) {
            Some((start, count)) if now.duration_since(*start) < self.window => {
                let reset = self.window - now.duration_since(*start);
                let secs = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);
                (self.max.saturating_sub(*count), secs)
            }
            _ => (self.max, self.window.as_secs()),
        }
    }

    fn count_at(&self, key: &str, now: Instant) -> u32 {
        let hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        match hits.get(key) {
            Some((start, count)) if now.duration_since(*start) < self.window => *count,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Every request counts.
    AllRequests,
    /// Only responses that are not 2xx count.
    FailuresOnly,
}

/// Per-IP request limiting. Over-limit requests get a 429 in the usual error envelope.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<FixedWindowLimiter>,
    mode: Mode,
    message: &'static str,
}

impl RateLimit {
    pub fn global(window: Duration, max: u32) -> Self {
        Self {
            limiter: Arc::new(FixedWindowLimiter::new(window, max)),
            mode: Mode::AllRequests,
            message: TOO_MANY_REQUESTS,
        }
    }

    /// Counts failed attempts only, so a successful login never uses up the budget.
    pub fn failed_logins(window: Duration, max: u32) -> Self {
        Self {
            limiter: Arc::new(FixedWindowLimiter::new(window, max)),
            mode: Mode::FailuresOnly,
            message: TOO_MANY_LOGINS,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service: Rc::new(service),
            limit: self.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    limit: RateLimit,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limit = self.limit.clone();
        let key = req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Box::pin(async move {
            let allowed = match limit.mode {
                Mode::AllRequests => limit.limiter.hit(&key),
                Mode::FailuresOnly => !limit.limiter.is_exhausted(&key),
            };
            if !allowed {
                log::warn!("Rate limit exceeded for {} on {}", key, req.path());
                let err = AppError::TooManyRequests(limit.message.to_string());
                let mut res = req.error_response(err);
                let reset = set_quota_headers(&mut res, &limit, &key);
                res.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(reset));
                return Ok(res.map_into_right_body());
            }

            let mut res = service.call(req).await?;
            if limit.mode == Mode::FailuresOnly && !res.status().is_success() {
                limit.limiter.hit(&key);
            }
            set_quota_headers(&mut res, &limit, &key);
            Ok(res.map_into_left_body())
        })
    }
}

/// Draft-standard `RateLimit-*` headers. Returns the reset delay in seconds.
fn set_quota_headers<B>(res: &mut ServiceResponse<B>, limit: &RateLimit, key: &str) -> u64 {
    let (remaining, reset) = limit.limiter.quota(key);
    let headers = res.headers_mut();
    headers.insert(
        HeaderName::from_static("ratelimit-limit"),
        HeaderValue::from(limit.limiter.max),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-remaining"),
        HeaderValue::from(remaining),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-reset"),
        HeaderValue::from(reset),
    );
    reset
}
