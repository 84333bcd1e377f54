//! HTTP client for the `/interactions` endpoint.
//!
//! Implements [`HighlightStore`] over reqwest. Every call is a single
//! attempt bounded by the configured timeout; failures are returned, never
//! retried.

use std::time::Duration;

use autoblog_config::Config;
use autoblog_engine::highlight::wire::{
    CreateHighlightRequest, CreateHighlightResponse, HighlightPayload, INTERACTIONS_PATH,
    ListHighlightsResponse,
};
use autoblog_engine::{Highlight, HighlightId, HighlightStore};
use url::Url;

/// Errors from interactions calls.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP transport error, including timeouts.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The service answered with a non-2xx status.
    #[error("interactions {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response body did not match the wire contract.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// A 2xx answer that still reported failure.
    #[error("interactions {endpoint} did not accept the highlight")]
    Rejected { endpoint: String },
    #[error("invalid base URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// [`HighlightStore`] backed by the interactions HTTP service.
#[derive(Debug, Clone)]
pub struct HttpHighlightStore {
    http: reqwest::Client,
    interactions_url: Url,
}

impl HttpHighlightStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let interactions_url = interactions_url(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| StoreError::Http {
                endpoint: "client_init".into(),
                source,
            })?;

        Ok(Self {
            http,
            interactions_url,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::new(&config.api_base_url, config.timeout())
    }

    pub fn interactions_url(&self) -> &Url {
        &self.interactions_url
    }

    /// Calls `GET {base_url}/interactions?slug={slug}`.
    pub async fn list_highlights(&self, slug: &str) -> Result<Vec<Highlight>, StoreError> {
        let endpoint = "GET /interactions";
        let mut url = self.interactions_url.clone();
        url.query_pairs_mut().append_pair("slug", slug);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.into(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let body: ListHighlightsResponse =
            resp.json()
                .await
                .map_err(|source| StoreError::Deserialization {
                    endpoint: endpoint.into(),
                    source,
                })?;

        log::debug!("fetched {} highlights for '{slug}'", body.highlights.len());
        Ok(body
            .highlights
            .into_iter()
            .map(|payload| payload.into_highlight(slug))
            .collect())
    }

    /// Calls `POST {base_url}/interactions` and returns the id the service
    /// stored the highlight under.
    pub async fn create_highlight(
        &self,
        slug: &str,
        highlight: &Highlight,
    ) -> Result<HighlightId, StoreError> {
        let endpoint = "POST /interactions";
        let request = CreateHighlightRequest {
            slug: slug.to_string(),
            highlight: HighlightPayload::from(highlight),
        };

        let resp = self
            .http
            .post(self.interactions_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.into(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let body: CreateHighlightResponse =
            resp.json()
                .await
                .map_err(|source| StoreError::Deserialization {
                    endpoint: endpoint.into(),
                    source,
                })?;

        if !body.success {
            return Err(StoreError::Rejected {
                endpoint: endpoint.into(),
            });
        }
        Ok(body.highlight.id)
    }
}

impl HighlightStore for HttpHighlightStore {
    type Error = StoreError;

    async fn list(&self, slug: &str) -> Result<Vec<Highlight>, StoreError> {
        self.list_highlights(slug).await
    }

    async fn create(&self, slug: &str, highlight: &Highlight) -> Result<HighlightId, StoreError> {
        self.create_highlight(slug, highlight).await
    }
}

/// `{base_url}/interactions`, keeping any path the base already has.
fn interactions_url(base_url: &str) -> Result<Url, StoreError> {
    let invalid = |source| StoreError::InvalidUrl {
        url: base_url.to_string(),
        source,
    };
    let mut base = Url::parse(base_url).map_err(invalid)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(INTERACTIONS_PATH.trim_start_matches('/'))
        .map_err(invalid)
}
