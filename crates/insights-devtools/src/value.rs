//! Console values
//!
//! Arguments passed to the console entry points, and their rendering to
//! diagnostic text.

use std::fmt;
use std::panic::Location;
use std::rc::Rc;

use serde_json::{Map, Number, Value as Json};

/// Error object (`new Error(...)`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ScriptError {
    /// Create an `Error` whose stack points at the caller
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::named("Error", message)
    }

    #[track_caller]
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        let caller = Location::caller();
        let stack = format!(
            "{}: {}\n    at {}:{}:{}",
            name,
            message,
            caller.file(),
            caller.line(),
            caller.column()
        );
        Self {
            name,
            message,
            stack: Some(stack),
        }
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

/// Failure while turning a value into JSON
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Converting circular structure to JSON")]
    Circular,

    #[error("{0}")]
    Custom(String),
}

/// Embedder-defined object that can show up in a console call
pub trait HostObject: fmt::Debug {
    fn to_json(&self) -> Result<Json, RenderError>;

    /// Text used when `to_json` fails
    fn describe(&self) -> String {
        "[object Object]".to_string()
    }
}

/// Console value
#[derive(Debug, Clone)]
pub enum ConsoleValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<ConsoleValue>),
    Object(Vec<(String, ConsoleValue)>),
    Function(String),
    Error(ScriptError),
    Host(Rc<dyn HostObject>),
}

impl ConsoleValue {
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, ConsoleValue)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array(items: impl IntoIterator<Item = ConsoleValue>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    pub fn as_error(&self) -> Option<&ScriptError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Boolean(*b),
            Json::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON form; `None` where JSON has no representation (undefined, functions)
    pub fn to_json(&self) -> Result<Option<Json>, RenderError> {
        Ok(match self {
            Self::Undefined | Self::Function(_) => None,
            Self::Null => Some(Json::Null),
            Self::Boolean(b) => Some(Json::Bool(*b)),
            Self::Number(n) => Some(number_to_json(*n)),
            Self::String(s) => Some(Json::String(s.clone())),
            Self::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.to_json()?.unwrap_or(Json::Null));
                }
                Some(Json::Array(out))
            }
            Self::Object(entries) => {
                let mut out = Map::new();
                for (key, value) in entries {
                    if let Some(json) = value.to_json()? {
                        out.insert(key.clone(), json);
                    }
                }
                Some(Json::Object(out))
            }
            // Error objects have no enumerable own properties
            Self::Error(_) => Some(Json::Object(Map::new())),
            Self::Host(host) => Some(host.to_json()?),
        })
    }
}

impl fmt::Display for ConsoleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_value(self))
    }
}

impl From<&str> for ConsoleValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ConsoleValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ConsoleValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for ConsoleValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for ConsoleValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for ConsoleValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<ScriptError> for ConsoleValue {
    fn from(e: ScriptError) -> Self {
        Self::Error(e)
    }
}

impl From<Json> for ConsoleValue {
    fn from(json: Json) -> Self {
        Self::from_json(&json)
    }
}

/// Render one value to diagnostic text. Never fails.
pub fn render_value(value: &ConsoleValue) -> String {
    match value {
        ConsoleValue::Undefined => "undefined".to_string(),
        ConsoleValue::Null => "null".to_string(),
        ConsoleValue::Boolean(b) => b.to_string(),
        ConsoleValue::Number(n) => format_number(*n),
        ConsoleValue::String(s) => s.clone(),
        ConsoleValue::Function(name) => format!("ƒ {}", name),
        ConsoleValue::Error(e) => e.to_string(),
        ConsoleValue::Array(_) | ConsoleValue::Object(_) | ConsoleValue::Host(_) => {
            match value.to_json() {
                Ok(Some(json)) => json.to_string(),
                Ok(None) => "undefined".to_string(),
                Err(err) => {
                    tracing::debug!("console value fell back to plain text: {}", err);
                    fallback_text(value)
                }
            }
        }
    }
}

/// Render a console call's arguments, space separated
pub fn render_args(args: &[ConsoleValue]) -> String {
    let mut output = String::new();
    for (i, value) in args.iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        output.push_str(&render_value(value));
    }
    output
}

fn fallback_text(value: &ConsoleValue) -> String {
    match value {
        ConsoleValue::Host(host) => host.describe(),
        ConsoleValue::Array(_) => "[Array]".to_string(),
        _ => "[Object]".to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        // covers -0 as well
        format!("{:.0}", n + 0.0)
    } else {
        n.to_string()
    }
}

fn number_to_json(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n == n.trunc() && n.abs() < 9_007_199_254_740_992.0 {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}
