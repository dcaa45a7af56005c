//! Host window
//!
//! The page's global scope as seen by the overlay: console and fetch entry
//! points, window event listeners, the display refresh signal, and optional
//! instrumentation. Single-threaded; shared through `Rc`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use insights_net::{HttpFetcher, NetError, Request, Response};

use crate::clock::{Clock, SystemClock};
use crate::events::{EventType, Listener, ListenerId, ListenerRegistry, Phase, WindowEvent};
use crate::value::{ConsoleValue, render_args};

/// Console entry point
pub type LogFn = Rc<dyn Fn(&[ConsoleValue])>;

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Response, NetError>>>>;

/// Fetch entry point
pub type FetchFn = Rc<dyn Fn(Request) -> FetchFuture>;

/// Frame callback, given the frame's timestamp
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Handle for cancelling a frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

/// Heap figures from the memory instrumentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub used_js_heap_size: u64,
    pub total_js_heap_size: u64,
}

/// Optional memory instrumentation
pub trait MemorySource {
    fn memory_info(&self) -> Option<MemoryInfo>;
}

#[derive(Default)]
struct FrameQueue {
    next_id: u64,
    pending: Vec<(FrameId, FrameCallback)>,
}

/// Fetch entry point backed by a real HTTP client
pub fn http_fetch(fetcher: HttpFetcher) -> FetchFn {
    Rc::new(move |request: Request| -> FetchFuture {
        let fetcher = fetcher.clone();
        Box::pin(async move { fetcher.fetch(request).await })
    })
}

fn default_console_log() -> LogFn {
    Rc::new(|args: &[ConsoleValue]| tracing::info!(target: "console", "{}", render_args(args)))
}

fn default_console_error() -> LogFn {
    Rc::new(|args: &[ConsoleValue]| tracing::error!(target: "console", "{}", render_args(args)))
}

fn default_fetch() -> FetchFn {
    Rc::new(|request: Request| -> FetchFuture {
        Box::pin(async move {
            Err(NetError::Network(format!(
                "no network available for {}",
                request.url()
            )))
        })
    })
}

/// Window builder
pub struct WindowBuilder {
    clock: Option<Rc<dyn Clock>>,
    memory: Option<Rc<dyn MemorySource>>,
    inner_size: (u32, u32),
    user_agent: String,
    dependencies: Option<Vec<(String, String)>>,
    console_log: Option<LogFn>,
    console_error: Option<LogFn>,
    fetch: Option<FetchFn>,
}

impl WindowBuilder {
    pub fn new() -> Self {
        Self {
            clock: None,
            memory: None,
            inner_size: (1280, 720),
            user_agent: format!("Console-Insights/{}", env!("CARGO_PKG_VERSION")),
            dependencies: None,
            console_log: None,
            console_error: None,
            fetch: None,
        }
    }

    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn memory(mut self, memory: Rc<dyn MemorySource>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn inner_size(mut self, width: u32, height: u32) -> Self {
        self.inner_size = (width, height);
        self
    }

    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = ua.to_string();
        self
    }

    /// Register a third-party dependency in the page's registry
    pub fn dependency(mut self, name: &str, version: &str) -> Self {
        self.dependencies
            .get_or_insert_with(Vec::new)
            .push((name.to_string(), version.to_string()));
        self
    }

    pub fn console_log(mut self, f: LogFn) -> Self {
        self.console_log = Some(f);
        self
    }

    pub fn console_error(mut self, f: LogFn) -> Self {
        self.console_error = Some(f);
        self
    }

    pub fn fetch(mut self, f: FetchFn) -> Self {
        self.fetch = Some(f);
        self
    }

    pub fn build(self) -> Rc<Window> {
        Rc::new(Window {
            console_log: RefCell::new(self.console_log.unwrap_or_else(default_console_log)),
            console_error: RefCell::new(self.console_error.unwrap_or_else(default_console_error)),
            fetch: RefCell::new(self.fetch.unwrap_or_else(default_fetch)),
            listeners: RefCell::new(ListenerRegistry::default()),
            frames: RefCell::new(FrameQueue::default()),
            clock: self.clock.unwrap_or_else(|| Rc::new(SystemClock::new())),
            memory: self.memory,
            inner_size: Cell::new(self.inner_size),
            user_agent: self.user_agent,
            dependencies: self.dependencies,
            intercepted: Cell::new(false),
        })
    }
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Page global scope
pub struct Window {
    console_log: RefCell<LogFn>,
    console_error: RefCell<LogFn>,
    fetch: RefCell<FetchFn>,
    listeners: RefCell<ListenerRegistry>,
    frames: RefCell<FrameQueue>,
    clock: Rc<dyn Clock>,
    memory: Option<Rc<dyn MemorySource>>,
    inner_size: Cell<(u32, u32)>,
    user_agent: String,
    dependencies: Option<Vec<(String, String)>>,
    intercepted: Cell<bool>,
}

impl Window {
    pub fn builder() -> WindowBuilder {
        WindowBuilder::new()
    }

    // ------------------------------------------------------------------
    // Console
    // ------------------------------------------------------------------

    /// `console.log(...args)`
    pub fn console_log(&self, args: &[ConsoleValue]) {
        let f = self.console_log.borrow().clone();
        f(args);
    }

    /// `console.error(...args)`
    pub fn console_error(&self, args: &[ConsoleValue]) {
        let f = self.console_error.borrow().clone();
        f(args);
    }

    pub fn console_log_fn(&self) -> LogFn {
        self.console_log.borrow().clone()
    }

    pub fn console_error_fn(&self) -> LogFn {
        self.console_error.borrow().clone()
    }

    /// Swap the `console.log` slot, returning the previous function
    pub fn replace_console_log(&self, f: LogFn) -> LogFn {
        self.console_log.replace(f)
    }

    /// Swap the `console.error` slot, returning the previous function
    pub fn replace_console_error(&self, f: LogFn) -> LogFn {
        self.console_error.replace(f)
    }

    // ------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------

    /// `fetch(input, init)`
    pub fn fetch(&self, request: impl Into<Request>) -> FetchFuture {
        let f = self.fetch.borrow().clone();
        f(request.into())
    }

    pub fn fetch_fn(&self) -> FetchFn {
        self.fetch.borrow().clone()
    }

    /// Swap the fetch slot, returning the previous function
    pub fn replace_fetch(&self, f: FetchFn) -> FetchFn {
        self.fetch.replace(f)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(&self, event_type: EventType, phase: Phase, listener: Listener) -> ListenerId {
        self.listeners.borrow_mut().add(event_type, phase, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Deliver an event to window listeners, capture phase first
    pub fn dispatch_event(&self, event: &WindowEvent) {
        // Listeners may add or remove listeners while running
        let route = self.listeners.borrow().route(event);
        for listener in route {
            listener(event);
        }
    }

    // ------------------------------------------------------------------
    // Display refresh
    // ------------------------------------------------------------------

    /// Run `callback` on the next display frame
    pub fn request_animation_frame(&self, callback: FrameCallback) -> FrameId {
        let mut frames = self.frames.borrow_mut();
        frames.next_id += 1;
        let id = FrameId(frames.next_id);
        frames.pending.push((id, callback));
        id
    }

    pub fn cancel_animation_frame(&self, id: FrameId) -> bool {
        let mut frames = self.frames.borrow_mut();
        let before = frames.pending.len();
        frames.pending.retain(|(pending, _)| *pending != id);
        frames.pending.len() != before
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().pending.len()
    }

    /// Host display tick: run callbacks requested before this frame.
    /// Callbacks requested while running wait for the next frame.
    pub fn run_frame(&self) -> usize {
        let due = std::mem::take(&mut self.frames.borrow_mut().pending);
        let now = self.clock.now();
        let count = due.len();
        for (_, callback) in due {
            callback(now);
        }
        count
    }

    // ------------------------------------------------------------------
    // Environment
    // ------------------------------------------------------------------

    pub fn clock(&self) -> Rc<dyn Clock> {
        self.clock.clone()
    }

    /// Memory figures, zero when no instrumentation is available
    pub fn memory_info(&self) -> MemoryInfo {
        self.memory
            .as_ref()
            .and_then(|m| m.memory_info())
            .unwrap_or_default()
    }

    pub fn inner_size(&self) -> (u32, u32) {
        self.inner_size.get()
    }

    /// Change the viewport. Does not dispatch `Resize`.
    pub fn set_inner_size(&self, width: u32, height: u32) {
        self.inner_size.set((width, height));
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Third-party dependency registry, if the page exposes one
    pub fn dependencies(&self) -> Option<&[(String, String)]> {
        self.dependencies.as_deref()
    }

    pub(crate) fn is_intercepted(&self) -> bool {
        self.intercepted.get()
    }

    pub(crate) fn set_intercepted(&self, value: bool) {
        self.intercepted.set(value);
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("inner_size", &self.inner_size.get())
            .field("user_agent", &self.user_agent)
            .field("listeners", &self.listener_count())
            .field("pending_frames", &self.pending_frames())
            .field("intercepted", &self.intercepted.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::ErrorEvent;

    #[test]
    fn test_replace_returns_previous() {
        let window = Window::builder().build();
        let original = window.console_log_fn();

        let replacement: LogFn = Rc::new(|_: &[ConsoleValue]| {});
        let previous = window.replace_console_log(replacement.clone());

        assert!(Rc::ptr_eq(&previous, &original));
        assert!(Rc::ptr_eq(&window.console_log_fn(), &replacement));
    }

    #[test]
    fn test_console_calls_current_slot() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let window = Window::builder()
            .console_log(Rc::new(move |args: &[ConsoleValue]| {
                sink.borrow_mut().push(render_args(args))
            }))
            .build();

        window.console_log(&["hello".into(), 1.into()]);
        assert_eq!(*seen.borrow(), ["hello 1"]);
    }

    #[test]
    fn test_default_fetch_rejects() {
        let window = Window::builder().build();
        let result = smol::block_on(window.fetch("https://example.test"));
        assert!(matches!(result, Err(NetError::Network(_))));
    }

    #[test]
    fn test_frames_requested_during_frame_run_next_frame() {
        let clock = Rc::new(ManualClock::new(0));
        let window = Window::builder().clock(clock.clone()).build();
        let ticks = Rc::new(Cell::new(0));

        let w = window.clone();
        let t = ticks.clone();
        window.request_animation_frame(Box::new(move |_| {
            t.set(t.get() + 1);
            let t = t.clone();
            w.request_animation_frame(Box::new(move |_| t.set(t.get() + 1)));
        }));

        assert_eq!(window.run_frame(), 1);
        assert_eq!(ticks.get(), 1);
        assert_eq!(window.pending_frames(), 1);
        assert_eq!(window.run_frame(), 1);
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn test_cancel_animation_frame() {
        let window = Window::builder().build();
        let id = window.request_animation_frame(Box::new(|_| {}));
        assert!(window.cancel_animation_frame(id));
        assert!(!window.cancel_animation_frame(id));
        assert_eq!(window.run_frame(), 0);
    }

    #[test]
    fn test_dispatch_routes_by_type() {
        let window = Window::builder().build();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        window.add_event_listener(
            EventType::Error,
            Phase::Capture,
            Rc::new(move |_: &WindowEvent| h.set(h.get() + 1)),
        );

        window.dispatch_event(&WindowEvent::Resize { width: 1, height: 1 });
        window.dispatch_event(&WindowEvent::Error(ErrorEvent::image_load_failed("a.png")));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_memory_defaults_to_zero() {
        let window = Window::builder().build();
        assert_eq!(window.memory_info(), MemoryInfo::default());
        assert!(window.dependencies().is_none());
    }
}
