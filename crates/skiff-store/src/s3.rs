//! S3-dialect HTTP backend.
//!
//! A boring client: HEAD to probe, GET to fetch, PUT to store, all against
//! `scheme://host/root/<prefix>/<key>`. No retry, no backoff, no redirect
//! handling beyond the HTTP library defaults.

use bytes::Bytes;
use reqwest::Method;
use skiff_types::Prefix;
use tracing::debug;
use url::Url;

use crate::error::StoreError;
use crate::sign::{self, Credentials};
use crate::traits::ObjectStore;

/// How much of an error response body is carried into the error message.
const BODY_SNIPPET_CHARS: usize = 256;

/// Configuration for an [`S3Store`].
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL, scheme and host only (e.g. `https://s3.amazonaws.com`).
    pub endpoint: Url,
    /// Root path under the endpoint: the bucket, or `bucket/prefix`.
    pub root: String,
    /// Region used in the signing scope.
    pub region: String,
    /// Credentials; requests are sent unsigned when absent.
    pub credentials: Option<Credentials>,
}

/// Object store speaking plain HEAD/GET/PUT against an S3-dialect endpoint.
///
/// The underlying HTTP client is safe to share across tasks; signing is
/// computed per request and mutates no shared state.
pub struct S3Store {
    endpoint: Url,
    root: String,
    region: String,
    credentials: Option<Credentials>,
    client: reqwest::Client,
}

impl S3Store {
    /// Create a store from the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the endpoint URL has no host.
    pub fn new(config: S3Config) -> Self {
        assert!(
            config.endpoint.host_str().is_some(),
            "endpoint URL must have a host"
        );
        Self {
            endpoint: config.endpoint,
            root: config.root,
            region: config.region,
            credentials: config.credentials,
            client: reqwest::Client::new(),
        }
    }

    /// Absolute URL for a key: `endpoint/root/<prefix>/<key>`.
    ///
    /// Segments are joined component-wise, so a trailing slash on the
    /// endpoint or a multi-segment root never produces double slashes.
    pub fn key_url(&self, prefix: Prefix, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .expect("http(s) endpoint URL accepts path segments");
            segments.pop_if_empty();
            for part in self.root.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
            segments.push(prefix.as_str());
            segments.push(key);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response, StoreError> {
        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let mut request = builder.build()?;

        // Sign last: the signature covers the final method, URL, and body.
        if let Some(creds) = &self.credentials {
            sign::sign_request(&mut request, creds, &self.region)?;
        }

        Ok(self.client.execute(request).await?)
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn has(&self, prefix: Prefix, key: &str) -> Result<bool, StoreError> {
        let url = self.key_url(prefix, key);
        let response = self.send(Method::HEAD, url.clone(), None).await?;

        match response.status().as_u16() {
            200 => Ok(true),
            // 403 means the caller lacks list permission; treated as absent
            // since a subsequent PUT resolves the actual state.
            404 | 403 => Ok(false),
            status => Err(StoreError::UnexpectedStatus {
                verb: "HEAD",
                url: url.to_string(),
                status,
                detail: String::new(),
            }),
        }
    }

    async fn get(&self, prefix: Prefix, key: &str) -> Result<Option<Bytes>, StoreError> {
        let url = self.key_url(prefix, key);
        let response = self.send(Method::GET, url.clone(), None).await?;

        match response.status().as_u16() {
            200 => Ok(Some(response.bytes().await?)),
            404 => Ok(None),
            status => Err(StoreError::UnexpectedStatus {
                verb: "GET",
                url: url.to_string(),
                status,
                detail: String::new(),
            }),
        }
    }

    async fn put(&self, prefix: Prefix, key: &str, body: Bytes) -> Result<(), StoreError> {
        let url = self.key_url(prefix, key);
        let size = body.len();
        let response = self.send(Method::PUT, url.clone(), Some(body)).await?;

        let status = response.status().as_u16();
        if status == 200 {
            debug!(%url, size, "stored object");
            return Ok(());
        }

        let snippet: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(BODY_SNIPPET_CHARS)
            .collect();
        Err(StoreError::UnexpectedStatus {
            verb: "PUT",
            url: url.to_string(),
            status,
            detail: format!(", body: {snippet}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(endpoint: &str, root: &str) -> S3Store {
        S3Store::new(S3Config {
            endpoint: Url::parse(endpoint).unwrap(),
            root: root.to_owned(),
            region: "us-east-1".to_owned(),
            credentials: None,
        })
    }

    #[test]
    fn test_key_url_layout() {
        let s3 = store("https://s3.amazonaws.com", "mybucket");
        let url = s3.key_url(Prefix::Content, "abc123");
        assert_eq!(url.as_str(), "https://s3.amazonaws.com/mybucket/content/abc123");
    }

    #[test]
    fn test_key_url_no_double_slash_with_trailing_endpoint() {
        let s3 = store("https://s3.amazonaws.com/", "mybucket");
        let url = s3.key_url(Prefix::Metadata, "some-uuid");
        assert_eq!(
            url.as_str(),
            "https://s3.amazonaws.com/mybucket/metadata/some-uuid"
        );
    }

    #[test]
    fn test_key_url_multi_segment_root() {
        let s3 = store("https://s3-eu-west-1.amazonaws.com", "bucket/team/projects");
        let url = s3.key_url(Prefix::Content, "deadbeef");
        assert_eq!(
            url.as_str(),
            "https://s3-eu-west-1.amazonaws.com/bucket/team/projects/content/deadbeef"
        );
    }

    #[test]
    fn test_key_url_ignores_empty_root_segments() {
        let s3 = store("https://s3.amazonaws.com", "/bucket//sub/");
        let url = s3.key_url(Prefix::Content, "k");
        assert_eq!(url.as_str(), "https://s3.amazonaws.com/bucket/sub/content/k");
    }

    #[test]
    fn test_unexpected_status_message_names_url_and_status() {
        let err = StoreError::UnexpectedStatus {
            verb: "GET",
            url: "https://s3.amazonaws.com/b/content/abc".to_owned(),
            status: 500,
            detail: String::new(),
        };
        let message = err.to_string();
        assert!(message.contains("GET"));
        assert!(message.contains("content/abc"));
        assert!(message.contains("500"));
    }
}
