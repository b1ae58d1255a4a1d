//! Movie-metadata lookups against TMDB.
//!
//! Every failure is an [`UpstreamError`]; callers are expected to degrade to
//! a fallback answer rather than fail the request.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::TmdbConfig;
use crate::error::ServerError;

/// A trending title with its average rating.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingTitle {
    /// Localised title (movies) or name (series).
    pub title: String,
    /// Average vote, 0–10.
    pub rating: f64,
}

/// Why a lookup produced no data.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No API key was supplied.
    #[error("TMDB API key is not configured")]
    MissingCredential,

    /// The request could not be sent or timed out.
    ///
    /// The wrapped error carries no URL: the query string holds the API key.
    #[error("TMDB request failed")]
    Request(#[source] reqwest::Error),

    /// TMDB answered with a non-success status.
    #[error("TMDB returned HTTP {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
    },

    /// The body was not the expected JSON.
    #[error("TMDB response could not be decoded")]
    Decode(#[source] reqwest::Error),
}

/// Source of weekly trending titles.
#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Returns up to `limit` titles, most popular first.
    async fn weekly_trending(&self, limit: usize) -> Result<Vec<TrendingTitle>, UpstreamError>;
}

/// TMDB REST client.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    language: String,
    api_key: Option<String>,
}

impl TmdbClient {
    /// Creates a client. An empty key counts as no key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &TmdbConfig, api_key: Option<String>) -> Result<Self, ServerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("ooottt-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ServerError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Returns `true` if an API key is configured.
    #[must_use]
    pub const fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Deserialize)]
struct TrendingPage {
    #[serde(default)]
    results: Vec<TrendingItem>,
}

#[derive(Deserialize)]
struct TrendingItem {
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    vote_average: f64,
}

impl TrendingItem {
    fn into_title(self) -> Option<TrendingTitle> {
        let title = self.title.or(self.name)?;
        Some(TrendingTitle {
            title,
            rating: self.vote_average,
        })
    }
}

#[async_trait]
impl TrendSource for TmdbClient {
    async fn weekly_trending(&self, limit: usize) -> Result<Vec<TrendingTitle>, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::MissingCredential)?;

        let url = format!("{}/trending/all/week", self.base_url);
        tracing::debug!(%url, language = %self.language, "Fetching trending titles");

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", api_key), ("language", self.language.as_str())])
            .send()
            .await
            .map_err(|e| UpstreamError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        let page: TrendingPage = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.without_url()))?;
        Ok(page
            .results
            .into_iter()
            .filter_map(TrendingItem::into_title)
            .take(limit)
            .collect())
    }
}
