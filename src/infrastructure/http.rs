//! The network fetch capability handed to store modules.
//!
//! Modules never talk to an HTTP client directly. They receive an
//! `Rc<dyn Fetch>` in `oncreate` and keep it for later requests, which lets
//! tests substitute a scripted implementation.
//!
//! A [`Fetch`] implementation only reports transport failures as errors. A
//! response with a failing status is still `Ok`; callers decide what a status
//! means via [`HttpResponse::is_success`].

use crate::domain::error::{BookInquiryError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

/// A received HTTP response, body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body text.
    pub body: String,
}

impl HttpResponse {
    /// A `200 OK` response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// - [`BookInquiryError::Http`] if the status is not 2xx
    /// - [`BookInquiryError::Json`] if the body is not valid JSON for `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if !self.is_success() {
            return Err(BookInquiryError::Http {
                status: self.status,
            });
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Issues `GET` requests.
#[async_trait(?Send)]
pub trait Fetch {
    /// Fetches `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BookInquiryError::Transport`] when no response was received.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// [`Fetch`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetch {
    client: Client,
}

impl ReqwestFetch {
    /// Creates a fetcher with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl Fetch for ReqwestFetch {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        debug!(url = %url, "GET");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(url = %url, status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchResponse;

    #[test]
    fn test_json_requires_success_status() {
        let failed = HttpResponse {
            status: 500,
            body: "{}".to_string(),
        };
        assert!(!failed.is_success());
        assert!(matches!(
            failed.json::<SearchResponse>(),
            Err(BookInquiryError::Http { status: 500 })
        ));

        let ok = HttpResponse::ok(r#"{"totalItems": 3, "items": []}"#);
        assert_eq!(ok.json::<SearchResponse>().unwrap().total_items, 3);

        let garbage = HttpResponse::ok("<html>");
        assert!(matches!(garbage.json::<SearchResponse>(), Err(BookInquiryError::Json(_))));
    }
}
