use crate::transport::Clock;
use log::debug;
use std::time::{Duration, Instant};

/// Minimum idle time between outbound requests.
///
/// The gap runs from the end of the previous request (success or failure) to
/// the start of the next one. Response latency and retry backoff never count
/// towards it: the caller calls [`Pacer::stamp`] once a request completes and
/// again once a backoff sleep is over, and [`Pacer::wait`] before every send.
/// After [`Pacer::start_pair`] the next gap is the larger of the request and
/// pair intervals.
#[derive(Debug, Clone)]
pub struct Pacer {
    request_interval: Duration,
    pair_interval: Duration,
    idle_since: Option<Instant>,
    pair_boundary: bool,
}

impl Pacer {
    pub fn new(request_interval: Duration, pair_interval: Duration) -> Self {
        Self {
            request_interval,
            pair_interval,
            idle_since: None,
            pair_boundary: false,
        }
    }

    /// Mark that the next request opens a new pair.
    pub fn start_pair(&mut self) {
        self.pair_boundary = true;
    }

    /// Gap the next request must respect.
    pub fn gap(&self) -> Duration {
        if self.pair_boundary {
            self.request_interval.max(self.pair_interval)
        } else {
            self.request_interval
        }
    }

    /// Start the gap now.
    pub fn stamp(&mut self, clock: &dyn Clock) {
        self.idle_since = Some(clock.now());
    }

    /// Block until the gap since the last stamp has elapsed.
    ///
    /// The very first request of a run is not delayed.
    pub fn wait(&mut self, clock: &dyn Clock) {
        if let Some(since) = self.idle_since {
            let gap = self.gap();
            let idle = clock.now().saturating_duration_since(since);
            if idle < gap {
                let remaining = gap - idle;
                debug!("pacing: waiting {:?}", remaining);
                clock.sleep(remaining);
            }
        }
        self.pair_boundary = false;
    }
}
