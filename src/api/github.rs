//! GitHub REST implementation of [`RemoteService`].

use super::models::{ApiMessage, RateLimitResponse, RateLimitState, SearchPage, UserRecord};
use super::RemoteService;
use crate::config::SearchConfig;
use crate::error::{ApiError, ApiResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// Thin client over the three GitHub endpoints the search core needs.
///
/// Cloning is cheap: `reqwest::Client` is reference counted internally.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    root: String,
}

impl GithubClient {
    /// Builds a client with the headers GitHub requires.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Client` if the user agent is not a valid header
    /// value or the TLS backend fails to initialize.
    pub fn new(config: &SearchConfig) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ApiError::Client(format!("invalid user agent: {e}")))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            root: config.api_root().to_string(),
        })
    }

    /// Issues a GET and returns the status and raw body.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> ApiResult<(StatusCode, String)> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "GET");
        Ok((status, body))
    }
}

impl RemoteService for GithubClient {
    async fn rate_limit(&self) -> ApiResult<RateLimitState> {
        let url = format!("{}/rate_limit", self.root);
        let (status, body) = self.get(&url, &[]).await?;
        let envelope: RateLimitResponse = decode(&url, status, &body)?;
        Ok(envelope.rate)
    }

    async fn search_users(&self, query: &str) -> ApiResult<SearchPage> {
        let url = format!("{}/search/users", self.root);
        let q = search_qualifier(query);
        let (status, body) = self.get(&url, &[("q", q.as_str())]).await?;
        decode(&url, status, &body)
    }

    async fn fetch_user(&self, login: &str) -> ApiResult<UserRecord> {
        let url = format!("{}/users/{login}", self.root);
        let (status, body) = self.get(&url, &[]).await?;
        decode(&url, status, &body)
    }
}

/// Restricts the search to the login field.
fn search_qualifier(query: &str) -> String {
    format!("{query} in:login")
}

/// Turns a status and body into either the expected payload or an `ApiError`.
///
/// Rate-limit answers come back as 403/429 with a `message` body, and
/// occasionally as a 200 carrying only that message.
fn decode<T: DeserializeOwned>(url: &str, status: StatusCode, body: &str) -> ApiResult<T> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimited);
    }

    if !status.is_success() {
        if let Ok(msg) = serde_json::from_str::<ApiMessage>(body) {
            if msg.is_rate_limit() {
                return Err(ApiError::RateLimited);
            }
        }
        return Err(ApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    serde_json::from_str::<T>(body).map_err(|e| {
        match serde_json::from_str::<ApiMessage>(body) {
            Ok(msg) if msg.is_rate_limit() => ApiError::RateLimited,
            _ => ApiError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            },
        }
    })
}
