//! Per-source retry + circuit breaker wrapper around one outbound call.

use std::future::Future;
use std::sync::Arc;

use crate::circuit_breaker::CircuitBreaker;
use crate::http_client::{HttpError, HttpResponse};
use crate::retry::RetryConfig;
use crate::source::{FetchError, FetchErrorKind};
use crate::{CallContext, CoreError, SourceId};

/// Runs a call factory under bounded retry, exponential backoff, and the
/// source's circuit breaker.
///
/// Cloning is cheap and clones share the same breaker, which is how one
/// breaker per source is kept while many location tasks call concurrently.
#[derive(Debug, Clone)]
pub struct ResilientExecutor {
    source: SourceId,
    retry: RetryConfig,
    breaker: Arc<CircuitBreaker>,
}

impl ResilientExecutor {
    pub fn new(
        source: SourceId,
        retry: RetryConfig,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, CoreError> {
        retry.validate()?;
        Ok(Self {
            source,
            retry,
            breaker,
        })
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Executes `call` until it succeeds, fails non-retryably, exhausts the
    /// retry budget, or the context is spent.
    ///
    /// `call` is invoked once per attempt so request state can be rebuilt.
    /// An attempt cut off by the deadline counts as a breaker failure; one
    /// cut off by shutdown only releases its breaker admission.
    pub async fn execute<T, F, Fut>(&self, ctx: &CallContext, mut call: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0u32;

        loop {
            ctx.check()?;

            let Some(permit) = CallPermit::acquire(&self.breaker, ctx) else {
                return Err(FetchError::circuit_open(&self.source));
            };

            let error = match ctx.run(call()).await {
                Ok(Ok(value)) => {
                    permit.succeed();
                    return Ok(value);
                }
                Ok(Err(error)) | Err(error) => error,
            };

            match error.kind() {
                // Dropping the permit settles these.
                FetchErrorKind::Cancelled | FetchErrorKind::CircuitOpen => return Err(error),
                FetchErrorKind::RemoteTransient | FetchErrorKind::RemoteRejected => permit.fail(),
            }

            if !error.retryable() || attempt >= self.retry.max_retries || ctx.is_expired() {
                return Err(error);
            }

            let delay = self.retry.delay_for_attempt(attempt);
            tracing::debug!(
                source = %self.source,
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retrying source call"
            );
            ctx.sleep(delay).await?;
            attempt += 1;
        }
    }
}

/// One breaker admission held for the duration of an attempt.
///
/// An attempt future can be dropped from outside (the orchestrator enforces
/// the same deadline around the whole source call), so an unsettled permit
/// settles itself on drop: as a failure once the deadline has passed,
/// otherwise as abandoned.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    ctx: &'a CallContext,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn acquire(breaker: &'a CircuitBreaker, ctx: &'a CallContext) -> Option<Self> {
        breaker.allow_request().then(|| Self {
            breaker,
            ctx,
            settled: false,
        })
    }

    fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if !self.ctx.cancel_token().is_cancelled() && self.ctx.is_expired() {
            self.breaker.record_failure();
        } else {
            self.breaker.record_abandoned();
        }
    }
}

/// Maps a completed HTTP exchange onto the fetch failure taxonomy.
///
/// 429 and 5xx are transient, any other non-2xx status is rejected.
pub fn classify_response(response: &HttpResponse) -> Result<(), FetchError> {
    if response.is_success() {
        return Ok(());
    }
    match response.status {
        429 => Err(FetchError::transient("rate limited (status 429)")),
        status if status >= 500 => Err(FetchError::transient(format!(
            "server error (status {status})"
        ))),
        status => Err(FetchError::rejected(format!(
            "unexpected status code {status}"
        ))),
    }
}

/// Transport failures are transient unless the client marked them otherwise.
pub fn classify_transport(error: HttpError) -> FetchError {
    if error.retryable() {
        FetchError::transient(format!("transport error: {}", error.message()))
    } else {
        FetchError::rejected(format!("transport error: {}", error.message()))
    }
}
