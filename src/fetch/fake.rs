//! In-memory [`HttpClient`] for unit tests.

use super::client::HttpClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Serves canned responses keyed by full request URL; unknown URLs get 404.
#[derive(Default)]
pub(crate) struct FakeClient {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_route(self, url: &str, status: u16, body: Vec<u8>) -> Self {
        self.set_route(url, status, body);
        self
    }

    pub(crate) fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Replaces the response for `url` on a client already in use.
    pub(crate) fn set_route(&self, url: &str, status: u16, body: Vec<u8>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body));
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of requests seen executing at the same time.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count on drop, including when a timeout cancels
/// the request.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let url = req.url().as_str().to_string();

        if let Some(delay) = self.delays.get(&url) {
            tokio::time::sleep(*delay).await;
        }

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or((404, Vec::new()));
        let resp = http::Response::builder()
            .status(status)
            .body(body)
            .expect("valid fake response");
        Ok(reqwest::Response::from(resp))
    }
}
