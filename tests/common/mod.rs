#![allow(dead_code)]

use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};
use wbi_bulk::transport::{Clock, Transport};
use wbi_bulk::{Downloader, DownloaderConfig, RequestError, RetryPolicy};

pub const BASE: &str = "http://mock.local/v2";

/// Clock that only moves when slept on or advanced, recording every sleep.
pub struct ManualClock {
    start: Instant,
    offset: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, d: Duration) {
        self.offset.set(self.offset.get() + d);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }

    fn sleep(&self, d: Duration) {
        self.sleeps.borrow_mut().push(d);
        self.advance(d);
    }
}

/// In-memory API: each URL answers from a queue; the last answer repeats.
/// Unknown URLs answer HTTP 404. Every request takes `latency` on the clock.
pub struct ScriptedTransport {
    clock: Rc<ManualClock>,
    latency: Cell<Duration>,
    routes: RefCell<HashMap<String, VecDeque<Result<Value, RequestError>>>>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(clock: Rc<ManualClock>) -> Self {
        Self {
            clock,
            latency: Cell::new(Duration::ZERO),
            routes: RefCell::default(),
            requests: RefCell::default(),
        }
    }

    pub fn set_latency(&self, d: Duration) {
        self.latency.set(d);
    }

    pub fn on(&self, url: &str, resp: Result<Value, RequestError>) -> &Self {
        self.routes
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(resp);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn hits(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Transport for ScriptedTransport {
    fn get_json(&self, url: &str) -> Result<Value, RequestError> {
        self.requests.borrow_mut().push(url.to_string());
        self.clock.advance(self.latency.get());
        let mut routes = self.routes.borrow_mut();
        match routes.get_mut(url) {
            Some(q) if q.len() > 1 => q.pop_front().unwrap(),
            Some(q) => q.front().cloned().unwrap(),
            None => Err(RequestError::Status(404)),
        }
    }
}

pub struct Harness {
    pub api: Rc<ScriptedTransport>,
    pub clock: Rc<ManualClock>,
    pub dl: Downloader,
}

/// No pacing, backoff of 100ms doubling, `max_attempts` tries.
pub fn config(max_attempts: u32) -> DownloaderConfig {
    DownloaderConfig {
        base_url: BASE.into(),
        request_interval_ms: 0,
        pair_interval_ms: 0,
        retry: RetryPolicy {
            max_attempts,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            multiplier: 2,
        },
        ..DownloaderConfig::default()
    }
}

pub fn harness(cfg: DownloaderConfig) -> Harness {
    let clock = Rc::new(ManualClock::default());
    let api = Rc::new(ScriptedTransport::new(clock.clone()));
    let dl = Downloader::with_parts(cfg, Box::new(api.clone()), Box::new(clock.clone()));
    Harness { api, clock, dl }
}

pub fn data_url(country: &str, indicator: &str, page: u32) -> String {
    format!(
        "{}/country/{}/indicator/{}?format=json&per_page=1000&page={}",
        BASE, country, indicator, page
    )
}

pub fn country_url(page: u32) -> String {
    format!("{}/country?format=json&per_page=300&page={}", BASE, page)
}

pub fn indicator_url(page: u32) -> String {
    format!("{}/indicator?format=json&per_page=1000&page={}", BASE, page)
}

pub fn envelope(page: u32, pages: u32, items: Value) -> Value {
    json!([{"page": page, "pages": pages, "per_page": "1000", "total": 0}, items])
}

pub fn obs(country: &str, indicator: &str, year: i32, value: Option<f64>) -> Value {
    json!({
        "indicator": {"id": indicator, "value": format!("Indicator {}", indicator)},
        "country": {"id": &country[..2], "value": format!("Country {}", country)},
        "countryiso3code": country,
        "date": year.to_string(),
        "value": value,
        "unit": "",
        "obs_status": "",
        "decimal": 0
    })
}

pub fn catalog_page(page: u32, pages: u32, ids: &[&str]) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| json!({"id": id, "name": id})).collect();
    envelope(page, pages, Value::Array(items))
}

/// One page containing a single observation for the pair.
pub fn single_obs_page(country: &str, indicator: &str) -> Value {
    envelope(1, 1, json!([obs(country, indicator, 2020, Some(1.0))]))
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
