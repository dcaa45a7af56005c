//! Fetch inputs
//!
//! The `(input, init)` pair handed to `fetch`.

use std::fmt;
use std::str::FromStr;

use crate::NetError;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            other => Err(NetError::Network(format!("unsupported method: {}", other))),
        }
    }
}

/// Fetch options (the `init` argument)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json(self, json: &str) -> Self {
        self.header("Content-Type", "application/json").body(json)
    }
}

/// A fetch call: request target plus optional options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    url: String,
    options: Option<FetchOptions>,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: None,
        }
    }

    pub fn with_options(url: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            url: url.into(),
            options: Some(options),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> Option<&FetchOptions> {
        self.options.as_ref()
    }

    /// Effective method, `GET` when unspecified
    pub fn method(&self) -> Method {
        self.options
            .as_ref()
            .and_then(|o| o.method)
            .unwrap_or_default()
    }

    pub fn headers(&self) -> &[(String, String)] {
        self.options
            .as_ref()
            .map(|o| o.headers.as_slice())
            .unwrap_or(&[])
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.options.as_ref().and_then(|o| o.body.as_deref())
    }

    /// Check the target parses as an absolute URL
    pub fn validate(&self) -> Result<url::Url, NetError> {
        url::Url::parse(&self.url).map_err(|e| NetError::InvalidUrl(format!("{}: {}", self.url, e)))
    }
}

impl From<&str> for Request {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Request {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_method_is_get() {
        let req = Request::new("https://example.com");
        assert_eq!(req.method(), Method::Get);
        assert!(req.headers().is_empty());
        assert!(req.body().is_none());
    }

    #[test]
    fn test_options_method() {
        let req = Request::with_options(
            "https://api.example.com",
            FetchOptions::new().method(Method::Post).json(r#"{"key": "value"}"#),
        );

        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.headers()[0], ("Content-Type".to_string(), "application/json".to_string()));
        assert_eq!(req.body(), Some(br#"{"key": "value"}"#.as_slice()));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Request::new("https://example.com/a?b=c").validate().is_ok());
        assert!(matches!(
            Request::new("not a url").validate(),
            Err(NetError::InvalidUrl(_))
        ));
    }
}
