//! Credential injection for feed requests.
//!
//! The legacy datamine endpoints take the access key as a `key` query
//! parameter ([`UrlParam`]); the current API gateway expects an `x-api-key`
//! header ([`ApiKey`]). Both wrap another [`crate::fetch::HttpClient`], so the
//! credential is added after the endpoint URL has been logged.

mod api_key;
mod url_param;

pub use api_key::{ApiKey, InvalidApiKey};
pub use url_param::UrlParam;
