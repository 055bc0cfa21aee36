//! Archive fetching
//!
//! Chart archives and repository indexes are downloaded over HTTP on cold
//! start. The client has a short timeout and optional basic auth.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{RepoError, Result};

/// Default client-side timeout for one download
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads raw bytes from a URL
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Basic auth credentials for a repository
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `ArchiveFetcher` over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    client: reqwest::Client,
    timeout: Duration,
    auth: Option<BasicAuth>,
}

impl HttpArchiveFetcher {
    /// Create a fetcher with the given client-side timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            timeout,
            auth: None,
        })
    }

    /// Builder: send basic auth with every request
    ///
    /// Empty usernames or passwords disable auth.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let password = password.into();
        self.auth = if username.is_empty() || password.is_empty() {
            None
        } else {
            Some(BasicAuth { username, password })
        };
        self
    }

    fn request_error(&self, e: reqwest::Error) -> RepoError {
        if e.is_timeout() {
            RepoError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            e.into()
        }
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::HttpError {
                status: status.as_u16(),
                message: format!("GET {} failed", url),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.request_error(e))?;
        debug!(url, bytes = bytes.len(), "fetched");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charts/app-0.1.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let fetcher = HttpArchiveFetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let bytes = fetcher
            .fetch(&format!("{}/charts/app-0.1.0.tgz", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_sends_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = HttpArchiveFetcher::new(DEFAULT_FETCH_TIMEOUT)
            .unwrap()
            .with_basic_auth("user", "pass");
        let bytes = fetcher.fetch(&format!("{}/index.yaml", server.uri())).await.unwrap();
        assert_eq!(bytes, b"ok");
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpArchiveFetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing.tgz", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::HttpError { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let fetcher = HttpArchiveFetcher::new(Duration::from_millis(200)).unwrap();
        let err = fetcher.fetch(&format!("{}/slow.tgz", server.uri())).await.unwrap_err();
        assert!(matches!(err, RepoError::Timeout { .. }));
    }

    #[test]
    fn test_empty_credentials_disable_auth() {
        let fetcher = HttpArchiveFetcher::new(DEFAULT_FETCH_TIMEOUT)
            .unwrap()
            .with_basic_auth("user", "");
        assert!(fetcher.auth.is_none());
    }
}
