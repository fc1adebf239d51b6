use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Boxed future returned by [`HttpClient::execute`].
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

/// GET request envelope used by adapter transport calls.
///
/// Weather providers only expose read endpoints, so there is no method or
/// body field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP response envelope returned by an adapter transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Adapter transport contract.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a>;
}

/// Production HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("skyblend/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url).timeout(request.timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else if e.is_builder() {
                    HttpError::non_retryable(format!("invalid request: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?;

            Ok(HttpResponse { status, body })
        })
    }
}

/// Canned transport for deterministic offline tests.
///
/// Routes are matched by URL substring in registration order. Each route
/// holds a queue of outcomes; the last outcome repeats once the queue drains.
/// A stalling route never answers its first `n` matches and is skipped after.
#[derive(Debug, Default)]
pub struct FixtureHttpClient {
    routes: Mutex<Vec<FixtureRoute>>,
    requests: Mutex<Vec<HttpRequest>>,
    calls: AtomicUsize,
}

#[derive(Debug)]
struct FixtureRoute {
    pattern: String,
    outcomes: Vec<Result<HttpResponse, HttpError>>,
    stalls: usize,
}

impl FixtureHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every request whose URL contains `pattern` with `response`.
    pub fn route(self, pattern: impl Into<String>, response: HttpResponse) -> Self {
        self.script(pattern, vec![Ok(response)])
    }

    /// Answers matching requests with `outcomes` in order.
    pub fn script(
        self,
        pattern: impl Into<String>,
        outcomes: Vec<Result<HttpResponse, HttpError>>,
    ) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FixtureRoute {
                pattern: pattern.into(),
                outcomes,
                stalls: 0,
            });
        self
    }

    /// Leaves the next `times` matching requests pending forever.
    pub fn stall(self, pattern: impl Into<String>, times: usize) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FixtureRoute {
                pattern: pattern.into(),
                outcomes: Vec::new(),
                stalls: times,
            });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `None` means the request stalls.
    fn respond(&self, url: &str) -> Option<Result<HttpResponse, HttpError>> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(route) = routes.iter_mut().find(|route| {
            url.contains(route.pattern.as_str()) && (route.stalls > 0 || !route.outcomes.is_empty())
        }) else {
            return Some(Ok(HttpResponse::with_status(404, "no fixture route")));
        };

        if route.stalls > 0 {
            route.stalls -= 1;
            return None;
        }
        match route.outcomes.len() {
            1 => Some(route.outcomes[0].clone()),
            _ => Some(route.outcomes.remove(0)),
        }
    }
}

impl HttpClient for FixtureHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.respond(&request.url);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        match outcome {
            Some(outcome) => Box::pin(async move { outcome }),
            None => Box::pin(std::future::pending()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_lowercased() {
        let request = HttpRequest::get("https://example.test/weather").with_header("X-Api-Key", "demo");

        assert_eq!(
            request.headers.get("x-api-key").map(String::as_str),
            Some("demo")
        );
    }

    #[tokio::test]
    async fn fixture_routes_by_substring_and_replays_script() {
        let client = FixtureHttpClient::new().script(
            "/current",
            vec![
                Err(HttpError::new("reset")),
                Ok(HttpResponse::ok_json("{\"ok\":true}")),
            ],
        );

        let first = client
            .execute(HttpRequest::get("https://api.test/current?q=x"))
            .await;
        let second = client
            .execute(HttpRequest::get("https://api.test/current?q=x"))
            .await;
        let third = client
            .execute(HttpRequest::get("https://api.test/current?q=x"))
            .await;
        let miss = client
            .execute(HttpRequest::get("https://api.test/other"))
            .await
            .expect("miss is a 404 response");

        assert!(first.is_err());
        assert_eq!(second, Ok(HttpResponse::ok_json("{\"ok\":true}")));
        assert_eq!(third, second);
        assert_eq!(miss.status, 404);
        assert_eq!(client.call_count(), 4);
        assert_eq!(client.requests().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_route_hangs_then_falls_through() {
        let client = FixtureHttpClient::new()
            .stall("/current", 1)
            .route("/current", HttpResponse::ok_json("{}"));

        let stalled = tokio::time::timeout(
            Duration::from_secs(5),
            client.execute(HttpRequest::get("https://api.test/current")),
        )
        .await;
        let answered = client
            .execute(HttpRequest::get("https://api.test/current"))
            .await;

        assert!(stalled.is_err());
        assert_eq!(answered, Ok(HttpResponse::ok_json("{}")));
        assert_eq!(client.call_count(), 2);
    }
}
