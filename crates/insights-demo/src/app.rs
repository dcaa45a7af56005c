//! Demo page
//!
//! A small page that logs, counts, fetches, throws and loads an image, so the
//! overlay has something of every kind to capture.

use std::cell::Cell;
use std::rc::Rc;

use insights_devtools::{ConsoleValue, ErrorEvent, ScriptError, Window, WindowEvent};
use insights_net::{HttpFetcher, Request};

pub struct DemoApp {
    window: Rc<Window>,
    images: Option<HttpFetcher>,
    count: Cell<u32>,
}

impl DemoApp {
    /// `images` loads `<img>` sources outside the page's fetch; None means
    /// every image fails
    pub fn new(window: Rc<Window>, images: Option<HttpFetcher>) -> Self {
        Self {
            window,
            images,
            count: Cell::new(0),
        }
    }

    pub fn mount(&self) {
        self.window.console_log(&["Component mounted".into()]);
    }

    pub fn unmount(&self) {
        self.window.console_log(&["Component will unmount".into()]);
    }

    pub fn count(&self) -> u32 {
        self.count.get()
    }

    pub fn increment_count(&self) {
        let count = self.count.get() + 1;
        self.count.set(count);
        self.window
            .console_log(&[format!("Count incremented to {}", count).into()]);
    }

    pub async fn fetch_data(&self, url: &str) {
        let data = match self.window.fetch(url).await {
            Ok(mut response) => response
                .json::<serde_json::Value>()
                .map_err(|e| ScriptError::named("SyntaxError", e.to_string())),
            Err(e) => Err(ScriptError::named("TypeError", e.to_string())),
        };

        match data {
            Ok(data) => self
                .window
                .console_log(&["Fetched data:".into(), ConsoleValue::from(data)]),
            Err(err) => self
                .window
                .console_error(&["Error fetching data:".into(), err.into()]),
        }
    }

    pub fn trigger_error(&self) {
        let error = ScriptError::new("This is a sample error message with stack trace");
        self.window.console_error(&[error.into()]);
    }

    /// Load an image; a failure fires the element's error event first, then
    /// the page's own `onerror` handler logs it
    pub async fn load_large_image(&self, src: &str) {
        let loaded = match &self.images {
            Some(fetcher) => match fetcher.fetch(Request::new(src)).await {
                Ok(response) => response.ok(),
                Err(err) => {
                    tracing::debug!("image {} failed: {}", src, err);
                    false
                }
            },
            None => false,
        };

        if loaded {
            self.window.console_log(&["Large image loaded".into()]);
            return;
        }

        let event = ErrorEvent::image_load_failed(src);
        self.window.dispatch_event(&WindowEvent::Error(event));
        self.window.console_error(&[
            "Error loading large image:".into(),
            ConsoleValue::object([("type", ConsoleValue::from("error"))]),
        ]);
    }
}
