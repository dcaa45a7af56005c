//! Interception layer
//!
//! Wraps the window's console and fetch entry points and listens for image
//! load failures, turning each observation into an `EventRecord`. Wrapped
//! calls always reach the original function with the original arguments, and
//! fetch results reach the caller untouched.
//!
//! Installation hands back an `Installation` token. Tearing it down (or
//! dropping it) puts the exact original functions back. A window can carry at
//! most one installation at a time.

use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use insights_net::{Request, Response};

use crate::buffer::CaptureSink;
use crate::clock::Clock;
use crate::config::OverlayConfig;
use crate::events::{EventTarget, EventType, ListenerId, Phase, WindowEvent};
use crate::record::{EventRecord, ImageDetails, NetworkDetails};
use crate::value::ConsoleValue;
use crate::window::{FetchFn, FetchFuture, LogFn, Window};

/// Installation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("Interception is already installed on this window")]
    AlreadyInstalled,
}

/// Response body capture settings
#[derive(Debug, Clone, Copy, Default)]
struct BodyCapture {
    enabled: bool,
    max_bytes: Option<usize>,
}

impl From<&OverlayConfig> for BodyCapture {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            enabled: config.capture_response_body,
            max_bytes: config.max_body_bytes,
        }
    }
}

/// Install interception on `window`, forwarding records to `sink`
pub fn install(
    window: &Rc<Window>,
    sink: Weak<dyn CaptureSink>,
    config: &OverlayConfig,
) -> Result<Installation, InstallError> {
    if window.is_intercepted() {
        tracing::warn!("refusing to wrap console and fetch twice");
        return Err(InstallError::AlreadyInstalled);
    }
    window.set_intercepted(true);

    let clock = window.clock();
    let original_log = window.console_log_fn();
    let original_error = window.console_error_fn();
    let original_fetch = window.fetch_fn();

    window.replace_console_log(wrap_log(original_log.clone(), sink.clone(), clock.clone()));
    window.replace_console_error(wrap_error(original_error.clone(), sink.clone(), clock.clone()));
    window.replace_fetch(wrap_fetch(
        original_fetch.clone(),
        sink.clone(),
        clock.clone(),
        BodyCapture::from(config),
    ));
    let image_listener = window.add_event_listener(
        EventType::Error,
        Phase::Capture,
        image_error_listener(sink, clock),
    );

    tracing::info!("console and fetch interception installed");

    Ok(Installation {
        window: window.clone(),
        original_log,
        original_error,
        original_fetch,
        image_listener,
        restored: false,
    })
}

/// Live interception; restores the originals on `teardown` or drop
#[must_use = "dropping the installation immediately restores the original entry points"]
pub struct Installation {
    window: Rc<Window>,
    original_log: LogFn,
    original_error: LogFn,
    original_fetch: FetchFn,
    image_listener: ListenerId,
    restored: bool,
}

impl Installation {
    /// Put the original entry points back and remove the listener
    pub fn teardown(mut self) {
        self.restore();
    }

    pub fn window(&self) -> &Rc<Window> {
        &self.window
    }

    fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;

        self.window.replace_console_log(self.original_log.clone());
        self.window.replace_console_error(self.original_error.clone());
        self.window.replace_fetch(self.original_fetch.clone());
        self.window.remove_event_listener(self.image_listener);
        self.window.set_intercepted(false);

        tracing::info!("console and fetch interception removed");
    }
}

impl Drop for Installation {
    fn drop(&mut self) {
        self.restore();
    }
}

fn emit(sink: &Weak<dyn CaptureSink>, record: EventRecord) {
    match sink.upgrade() {
        Some(sink) => sink.capture(record),
        None => tracing::trace!("capture sink gone, dropping {} record", record.kind()),
    }
}

fn wrap_log(original: LogFn, sink: Weak<dyn CaptureSink>, clock: Rc<dyn Clock>) -> LogFn {
    Rc::new(move |args: &[ConsoleValue]| {
        emit(&sink, EventRecord::log(args, clock.epoch_ms()));
        original(args);
    })
}

fn wrap_error(original: LogFn, sink: Weak<dyn CaptureSink>, clock: Rc<dyn Clock>) -> LogFn {
    Rc::new(move |args: &[ConsoleValue]| {
        emit(&sink, EventRecord::console_error(args, clock.epoch_ms()));
        original(args);
    })
}

fn wrap_fetch(
    original: FetchFn,
    sink: Weak<dyn CaptureSink>,
    clock: Rc<dyn Clock>,
    body: BodyCapture,
) -> FetchFn {
    Rc::new(move |request: Request| -> FetchFuture {
        let started = clock.now();
        let url = request.url().to_string();
        let method = request.method();
        // the original starts now, whether or not the caller ever polls
        let pending = original(request);

        let sink = sink.clone();
        let clock = clock.clone();
        Box::pin(async move {
            let result = pending.await;

            let duration_ms = elapsed_ms(started, clock.now());
            let timestamp = clock.epoch_ms();
            match &result {
                Ok(response) => {
                    let details = NetworkDetails {
                        url,
                        method: method.as_str().to_string(),
                        status: response.status(),
                        status_text: response.status_text().to_string(),
                        headers: header_map(response),
                        response_body: capture_body(response, body),
                    };
                    emit(&sink, EventRecord::network(details, duration_ms, timestamp));
                }
                Err(err) => {
                    emit(
                        &sink,
                        EventRecord::network_failure(&url, &err.to_string(), duration_ms, timestamp),
                    );
                }
            }
            result
        })
    })
}

fn image_error_listener(sink: Weak<dyn CaptureSink>, clock: Rc<dyn Clock>) -> Rc<dyn Fn(&WindowEvent)> {
    Rc::new(move |event: &WindowEvent| {
        let WindowEvent::Error(error_event) = event else {
            return;
        };
        let EventTarget::Image { src } = &error_event.target else {
            return;
        };

        let error_message = error_event
            .error
            .as_ref()
            .map(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .or_else(|| Some(error_event.message.clone()).filter(|m| !m.is_empty()))
            .unwrap_or_else(|| "Unknown error".to_string());
        let stack = error_event.error.as_ref().and_then(|e| e.stack.clone());

        let details = ImageDetails {
            src: src.clone(),
            error_message,
            stack,
        };
        emit(&sink, EventRecord::image(details, clock.epoch_ms()));
    })
}

fn elapsed_ms(started: f64, finished: f64) -> u64 {
    (finished - started).max(0.0).round() as u64
}

fn header_map(response: &Response) -> BTreeMap<String, String> {
    response
        .headers()
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect()
}

/// Text copy of the body read through a duplicate; the caller's response
/// stays unread
fn capture_body(response: &Response, body: BodyCapture) -> Option<String> {
    if !body.enabled {
        return None;
    }
    let text = match response.try_clone().and_then(|mut copy| copy.text()) {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!("response body not captured for {}: {}", response.url(), err);
            return None;
        }
    };
    Some(match body.max_bytes {
        Some(max) => truncate_at_char_boundary(text, max),
        None => text,
    })
}

fn truncate_at_char_boundary(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CaptureBuffer;
    use crate::clock::ManualClock;
    use crate::events::ErrorEvent;
    use crate::record::{Details, EventKind};
    use crate::value::ScriptError;

    fn setup() -> (Rc<Window>, Rc<CaptureBuffer>, Weak<dyn CaptureSink>) {
        let window = Window::builder()
            .clock(Rc::new(ManualClock::new(1_000)))
            .console_log(Rc::new(|_: &[ConsoleValue]| {}))
            .console_error(Rc::new(|_: &[ConsoleValue]| {}))
            .build();
        let buffer = Rc::new(CaptureBuffer::new());
        let sink: Rc<dyn CaptureSink> = buffer.clone();
        (window, buffer, Rc::downgrade(&sink))
    }

    #[test]
    fn test_second_install_is_rejected() {
        let (window, _buffer, sink) = setup();
        let first = install(&window, sink.clone(), &OverlayConfig::default()).unwrap();
        let second = install(&window, sink.clone(), &OverlayConfig::default());
        assert_eq!(second.err(), Some(InstallError::AlreadyInstalled));

        first.teardown();
        let again = install(&window, sink, &OverlayConfig::default());
        assert!(again.is_ok());
    }

    #[test]
    fn test_drop_restores_originals() {
        let (window, _buffer, sink) = setup();
        let log = window.console_log_fn();
        let listeners = window.listener_count();

        let installation = install(&window, sink, &OverlayConfig::default()).unwrap();
        assert!(!Rc::ptr_eq(&window.console_log_fn(), &log));
        assert_eq!(window.listener_count(), listeners + 1);

        drop(installation);
        assert!(Rc::ptr_eq(&window.console_log_fn(), &log));
        assert_eq!(window.listener_count(), listeners);
    }

    #[test]
    fn test_log_reaches_original_after_capture() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let buffer = Rc::new(CaptureBuffer::new());
        let seen_buffer = buffer.clone();
        let seen = order.clone();
        let window = Window::builder()
            .console_log(Rc::new(move |args: &[ConsoleValue]| {
                seen.borrow_mut().push((args.len(), seen_buffer.len()));
            }))
            .build();
        let sink: Rc<dyn CaptureSink> = buffer.clone();

        let _installation = install(&window, Rc::downgrade(&sink), &OverlayConfig::default()).unwrap();
        window.console_log(&["a".into(), "b".into()]);

        // original saw both args, after the record was already captured
        assert_eq!(*order.borrow(), [(2, 1)]);
    }

    #[test]
    fn test_image_listener_ignores_other_targets() {
        let (window, buffer, sink) = setup();
        let _installation = install(&window, sink, &OverlayConfig::default()).unwrap();

        window.dispatch_event(&WindowEvent::Error(ErrorEvent {
            target: EventTarget::Script { src: "app.js".into() },
            message: String::new(),
            error: None,
        }));
        window.dispatch_event(&WindowEvent::Error(ErrorEvent::uncaught(ScriptError::new("x"))));
        assert!(buffer.is_empty());

        window.dispatch_event(&WindowEvent::Error(ErrorEvent::image_load_failed(
            "https://img.test/big.jpg",
        )));
        let record = buffer.get(0).unwrap();
        assert_eq!(record.kind(), EventKind::Image);
        assert_eq!(record.message(), "Error loading image: https://img.test/big.jpg");
        match record.details() {
            Some(Details::Image(d)) => {
                assert_eq!(d.error_message, "Unknown error");
                assert!(d.stack.is_none());
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_records_dropped_once_sink_is_gone() {
        let (window, buffer, sink) = setup();
        let _installation = install(&window, sink, &OverlayConfig::default()).unwrap();
        drop(buffer);

        // must not panic
        window.console_log(&["after".into()]);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate_at_char_boundary("héllo".to_string(), 2), "h");
        assert_eq!(truncate_at_char_boundary("abc".to_string(), 10), "abc");
    }
}
