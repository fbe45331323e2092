//! Feed Fetcher: concurrent, failure-isolated HTTP fetches.

mod basic;
mod client;
pub mod auth;
#[cfg(test)]
pub(crate) mod fake;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::FetchError;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, error, info};

/// Outcome of one endpoint request within a fetch round.
#[derive(Debug)]
pub struct FetchResult {
    pub endpoint: String,
    pub outcome: Result<Bytes, FetchError>,
}

impl FetchResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Limits applied to a fetch round.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Maximum number of requests in flight at once.
    pub concurrency: usize,
    /// Deadline for a single request, body included.
    pub timeout: Duration,
}

/// Issues a single GET and returns the body of a successful response.
///
/// # Errors
///
/// Returns [`FetchError::Status`] for any non-2xx answer, and
/// [`FetchError::Request`] / [`FetchError::Timeout`] for transport failures.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::Url {
        endpoint: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            endpoint: url.to_string(),
            status,
        });
    }

    resp.bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))
}

/// Requests every endpoint concurrently and waits for all of them.
///
/// One attempt per endpoint, no retry. A failing endpoint never aborts the
/// others; its error is logged and recorded in its [`FetchResult`]. Results
/// come back in `endpoints` order regardless of completion order.
#[tracing::instrument(skip(client, endpoints), fields(endpoints = endpoints.len()))]
pub async fn fetch_all<C>(client: Arc<C>, endpoints: &[String], options: FetchOptions) -> Vec<FetchResult>
where
    C: HttpClient + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = Vec::with_capacity(endpoints.len());

    for endpoint in endpoints {
        let sem = semaphore.clone();
        let client = client.clone();
        let url = endpoint.clone();
        let timeout = options.timeout;

        let span = tracing::debug_span!("fetch_feed", endpoint = %endpoint);

        let task = tokio::spawn(
            async move {
                let Ok(_permit) = sem.acquire().await else {
                    return Err(FetchError::Task {
                        endpoint: url,
                        reason: "worker pool closed".to_string(),
                    });
                };

                debug!("Requesting feed");
                match tokio::time::timeout(timeout, fetch_bytes(client.as_ref(), &url)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(FetchError::Timeout { endpoint: url.clone() }),
                }
            }
            .instrument(span),
        );

        tasks.push(task);
    }

    let mut results = Vec::with_capacity(tasks.len());
    for (endpoint, task) in endpoints.iter().zip(tasks) {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(FetchError::Task {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            }),
        };

        match &outcome {
            Ok(body) => debug!(endpoint = %endpoint, bytes = body.len(), "Feed fetched"),
            Err(e) => error!(endpoint = %endpoint, error = %e, "Feed fetch failed"),
        }

        results.push(FetchResult {
            endpoint: endpoint.clone(),
            outcome,
        });
    }

    let ok = results.iter().filter(|r| r.is_ok()).count();
    info!(ok, failed = results.len() - ok, "Fetch round complete");

    results
}
