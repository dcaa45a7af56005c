//! HTTP Fetcher
//!
//! Real network backend for the fetch entry point. The blocking reqwest
//! client runs on smol's blocking pool so callers only see a future.

use std::time::Duration;

use crate::{NetError, Request, Response};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string
    pub user_agent: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max redirects to follow (0 = disable)
    pub max_redirects: usize,
    /// Default headers
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Console-Insights/0.1".into(),
            request_timeout: Duration::from_secs(30),
            max_redirects: 10,
            default_headers: Vec::new(),
        }
    }
}

/// HTTP fetcher builder
pub struct HttpFetcherBuilder {
    config: ClientConfig,
}

impl HttpFetcherBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn user_agent(mut self, ua: &str) -> Self {
        self.config.user_agent = ua.to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        self.config.default_headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> Result<HttpFetcher, NetError> {
        HttpFetcher::with_config(self.config)
    }
}

impl Default for HttpFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch backend over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    config: ClientConfig,
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> Result<Self, NetError> {
        Self::builder().build()
    }

    /// Create a fetcher builder
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::new()
    }

    /// Create with custom config
    pub fn with_config(config: ClientConfig) -> Result<Self, NetError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| NetError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform a request
    pub async fn fetch(&self, request: Request) -> Result<Response, NetError> {
        request.validate()?;
        tracing::debug!("HTTP {} {}", request.method(), request.url());

        let client = self.client.clone();
        let default_headers = self.config.default_headers.clone();
        smol::unblock(move || execute(&client, &default_headers, request)).await
    }
}

fn execute(
    client: &reqwest::blocking::Client,
    default_headers: &[(String, String)],
    request: Request,
) -> Result<Response, NetError> {
    let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
        .map_err(|e| NetError::Network(e.to_string()))?;

    let mut builder = client.request(method, request.url());
    for (name, value) in default_headers.iter().chain(request.headers()) {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = request.body() {
        builder = builder.body(body.to_vec());
    }

    let response = builder.send().map_err(|e| map_error(request.url(), e))?;

    let status = response.status();
    let url = response.url().to_string();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = response.bytes().map_err(|e| map_error(request.url(), e))?;

    Ok(Response::new(status.as_u16())
        .with_url(url)
        .with_status_text(status.canonical_reason().unwrap_or(""))
        .with_headers(headers)
        .with_body(body.to_vec()))
}

fn map_error(url: &str, err: reqwest::Error) -> NetError {
    if err.is_timeout() {
        NetError::Timeout(url.to_string())
    } else {
        NetError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_config() {
        let fetcher = HttpFetcher::builder()
            .user_agent("test-agent")
            .request_timeout(Duration::from_secs(5))
            .max_redirects(0)
            .default_header("Accept", "application/json")
            .build()
            .unwrap();

        assert_eq!(fetcher.config().user_agent, "test-agent");
        assert_eq!(fetcher.config().request_timeout, Duration::from_secs(5));
        assert_eq!(fetcher.config().max_redirects, 0);
        assert_eq!(fetcher.config().default_headers.len(), 1);
    }

    #[test]
    fn test_invalid_url_fails_before_network() {
        let fetcher = HttpFetcher::new().unwrap();
        let result = smol::block_on(fetcher.fetch(Request::new("::nope::")));
        assert!(matches!(result, Err(NetError::InvalidUrl(_))));
    }
}
