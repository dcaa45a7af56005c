//! Event records
//!
//! One normalized, immutable observation per captured event.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::value::{ConsoleValue, ScriptError, render_args};

/// What produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Log,
    Network,
    Error,
    Performance,
    Image,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Log => "log",
            EventKind::Network => "network",
            EventKind::Error => "error",
            EventKind::Performance => "performance",
            EventKind::Image => "image",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error object captured from `console.error(err, ...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetails {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl From<&ScriptError> for ErrorDetails {
    fn from(err: &ScriptError) -> Self {
        Self {
            name: err.name.clone(),
            message: err.message.clone(),
            stack: err.stack.clone(),
        }
    }
}

/// Completed fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDetails {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

/// Rejected fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFailureDetails {
    pub error_message: String,
}

/// Image that failed to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    pub src: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Kind-specific payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Details {
    Error(ErrorDetails),
    Network(NetworkDetails),
    NetworkFailure(NetworkFailureDetails),
    Image(ImageDetails),
}

/// Captured event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    kind: EventKind,
    message: String,
    timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Details>,
}

impl EventRecord {
    pub fn new(kind: EventKind, message: impl Into<String>, timestamp: u64) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = Some(details);
        self
    }

    /// `console.log(...args)`
    pub fn log(args: &[ConsoleValue], timestamp: u64) -> Self {
        Self::new(EventKind::Log, render_args(args), timestamp)
    }

    /// `console.error(...args)`; an error object in first position fills the details
    pub fn console_error(args: &[ConsoleValue], timestamp: u64) -> Self {
        let record = Self::new(EventKind::Error, render_args(args), timestamp);
        match args.first().and_then(ConsoleValue::as_error) {
            Some(err) => record.with_details(Details::Error(err.into())),
            None => record,
        }
    }

    pub fn network(details: NetworkDetails, duration_ms: u64, timestamp: u64) -> Self {
        let message = format!(
            "{} - Status: {} - Duration: {}ms",
            details.url, details.status, duration_ms
        );
        Self::new(EventKind::Network, message, timestamp).with_details(Details::Network(details))
    }

    pub fn network_failure(url: &str, error: &str, duration_ms: u64, timestamp: u64) -> Self {
        let message = format!("{} - Error: {} - Duration: {}ms", url, error, duration_ms);
        Self::new(EventKind::Error, message, timestamp).with_details(Details::NetworkFailure(
            NetworkFailureDetails {
                error_message: error.to_string(),
            },
        ))
    }

    pub fn image(details: ImageDetails, timestamp: u64) -> Self {
        let message = format!("Error loading image: {}", details.src);
        Self::new(EventKind::Image, message, timestamp).with_details(Details::Image(details))
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Milliseconds since the Unix epoch
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }
}
