//! Fetch response
//!
//! A response whose body can be read once. `try_clone` tees the body so an
//! observer can read its own copy without draining the caller's.

use crate::NetError;

/// Fetch response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    url: String,
    status: u16,
    status_text: String,
    headers: Vec<(String, String)>,
    // None once consumed
    body: Option<Vec<u8>>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            url: String::new(),
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: Some(Vec::new()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Check if response is OK (2xx)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get all headers
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_used(&self) -> bool {
        self.body.is_none()
    }

    /// Duplicate the response without consuming this one's body
    pub fn try_clone(&self) -> Result<Response, NetError> {
        if self.body_used() {
            return Err(NetError::BodyUsed);
        }
        Ok(self.clone())
    }

    /// Consume the body as raw bytes
    pub fn bytes(&mut self) -> Result<Vec<u8>, NetError> {
        self.body.take().ok_or(NetError::BodyUsed)
    }

    /// Consume the body as text, replacing invalid UTF-8
    pub fn text(&mut self) -> Result<String, NetError> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Consume the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T, NetError> {
        let bytes = self.bytes()?;
        serde_json::from_slice(&bytes).map_err(|e| NetError::Decode(e.to_string()))
    }
}
