use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

const USER_AGENT: &str = concat!("subway_arrivals/", env!("CARGO_PKG_VERSION"));

/// Plain reqwest transport with a bounded connect timeout.
///
/// The overall per-request deadline is enforced by [`crate::fetch::fetch_all`]
/// so that it holds for any [`HttpClient`], not only this one.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new(connect_timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
