use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Runtime circuit state for one source's upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker.
    pub failure_threshold: u32,
    /// Rolling window after which closed-state failure counts reset.
    /// `Duration::ZERO` never resets.
    pub failure_window: Duration,
    /// Cool-down spent open before trial calls are admitted.
    pub open_timeout: Duration,
    /// Trial calls admitted while half-open.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            open_timeout: Duration::from_secs(120),
            half_open_max_calls: 5,
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    window_started: Instant,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
}

impl CircuitInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            window_started: Instant::now(),
            opened_at: None,
            half_open_in_flight: 0,
        }
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.window_started = Instant::now();
        self.opened_at = None;
        self.half_open_in_flight = 0;
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.half_open_in_flight = 0;
    }
}

/// Thread-safe circuit breaker for one source's network requests.
///
/// Share a single instance per source (behind an `Arc`) across every caller
/// hitting that source, otherwise failures are counted piecemeal.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CircuitInner::new()),
        }
    }

    pub fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// Admits or rejects one call. An admitted call must be settled with
    /// [`record_success`](Self::record_success),
    /// [`record_failure`](Self::record_failure) or
    /// [`record_abandoned`](Self::record_abandoned).
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => self.admit_trial(&mut inner),
            CircuitState::Open => {
                let cool_down_elapsed = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= self.config.open_timeout)
                    .unwrap_or(false);

                if cool_down_elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.opened_at = None;
                    inner.half_open_in_flight = 0;
                    self.admit_trial(&mut inner)
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.lock().close();
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                inner.open();
            }
            CircuitState::Closed => {
                if !self.config.failure_window.is_zero()
                    && inner.window_started.elapsed() >= self.config.failure_window
                {
                    inner.consecutive_failures = 0;
                    inner.window_started = Instant::now();
                }
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.open();
                }
            }
            // A late failure from a call admitted before the trip.
            CircuitState::Open => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
            }
        }
    }

    /// Releases a half-open trial slot for a call that never completed.
    pub fn record_abandoned(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn admit_trial(&self, inner: &mut CircuitInner) -> bool {
        if inner.half_open_in_flight < self.config.half_open_max_calls.max(1) {
            inner.half_open_in_flight += 1;
            true
        } else {
            false
        }
    }

    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(failure_threshold: u32, open_timeout: Duration) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            failure_window: Duration::ZERO,
            open_timeout,
            half_open_max_calls: 1,
        }
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(config(2, Duration::from_millis(10)));

        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn transitions_to_half_open_after_timeout_then_closes_on_success() {
        let breaker = CircuitBreaker::new(config(1, Duration::from_millis(1)));

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(2));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(config(3, Duration::from_millis(1)));
        for _ in 0..3 {
            breaker.record_failure();
        }

        std::thread::sleep(Duration::from_millis(2));
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn half_open_admits_only_configured_trials() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            half_open_max_calls: 2,
            ..config(1, Duration::from_millis(1))
        });
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(2));

        assert!(breaker.allow_request());
        assert!(breaker.allow_request());
        assert!(!breaker.allow_request());

        breaker.record_abandoned();
        assert!(breaker.allow_request());
    }

    #[test]
    fn success_resets_consecutive_count() {
        let breaker = CircuitBreaker::new(config(3, Duration::from_secs(60)));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 1);
    }

    #[test]
    fn failures_outside_window_do_not_accumulate() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_window: Duration::from_millis(5),
            ..config(2, Duration::from_secs(60))
        });

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(10));
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 1);
    }
}
