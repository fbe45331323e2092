use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

/// The transport seam every network request in the pipeline goes through.
///
/// Credential decorators in [`crate::fetch::auth`] wrap an inner client, and
/// tests substitute a fake that serves canned responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
