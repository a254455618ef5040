//! The "do one HTTP request" primitive and the clock it waits on.
//!
//! Both are traits so the pipeline can be driven by scripted responses and a
//! manual clock in tests.
use crate::config::DownloaderConfig;
use crate::error::RequestError;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::time::{Duration, Instant};

/// One GET returning a decoded JSON body, or a classified failure.
pub trait Transport {
    fn get_json(&self, url: &str) -> Result<Value, RequestError>;
}

/// Source of time for pacing and retry backoff.
pub trait Clock {
    fn now(&self) -> Instant;
    /// Block for `d`. Afterwards `now()` has advanced by at least `d`.
    fn sleep(&self, d: Duration);
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, d: Duration) {
        (**self).sleep(d)
    }
}

impl<T: Transport + ?Sized> Transport for std::rc::Rc<T> {
    fn get_json(&self, url: &str) -> Result<Value, RequestError> {
        (**self).get_json(url)
    }
}

/// `reqwest` blocking client against the live API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(cfg: &DownloaderConfig) -> reqwest::Result<Self> {
        let http = HttpClient::builder()
            .timeout(cfg.request_timeout()) // total request timeout
            .connect_timeout(cfg.connect_timeout())
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("wbi_bulk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str) -> Result<Value, RequestError> {
        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|e| RequestError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RequestError::Status(status.as_u16()));
        }
        // Read the body first: a dropped connection mid-body is a network error,
        // only a complete body that fails to parse is malformed.
        let body = resp
            .text()
            .map_err(|e| RequestError::Network(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| RequestError::Malformed(format!("decode json: {}", e)))
    }
}

/// Clock that only moves when slept on (or advanced by hand), recording each sleep.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    start: Instant,
    offset: std::cell::Cell<Duration>,
    sleeps: std::cell::RefCell<Vec<Duration>>,
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            offset: Default::default(),
            sleeps: Default::default(),
        }
    }
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn advance(&self, d: Duration) {
        self.offset.set(self.offset.get() + d);
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }

    fn sleep(&self, d: Duration) {
        self.sleeps.borrow_mut().push(d);
        self.advance(d);
    }
}
