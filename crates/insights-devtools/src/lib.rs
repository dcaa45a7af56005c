//! Console Insights developer tools
//!
//! Diagnostic overlay for a host window: captures console output, fetch
//! traffic and image load failures into a buffer of event records, and keeps a
//! live performance snapshot driven by the display refresh signal.
//!
//! ```ignore
//! let window = Window::builder().build();
//! let mut overlay = Overlay::default();
//! overlay.mount(&window)?;
//! window.console_log(&["Component mounted".into()]);
//! println!("{}", panel::render_panel(&overlay));
//! overlay.unmount();
//! ```

pub mod buffer;
pub mod clock;
pub mod config;
pub mod events;
pub mod intercept;
pub mod overlay;
pub mod panel;
pub mod record;
pub mod sampler;
pub mod value;
pub mod window;

pub use buffer::{CaptureBuffer, CaptureSink, RecordStore, RingStore, UnboundedStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{OverlayConfig, OverlayConfigBuilder};
pub use events::{ErrorEvent, EventTarget, EventType, ListenerId, Phase, WindowEvent};
pub use intercept::{InstallError, Installation};
pub use overlay::{Overlay, OverlayError};
pub use record::{
    Details, ErrorDetails, EventKind, EventRecord, ImageDetails, NetworkDetails, NetworkFailureDetails,
};
pub use sampler::{FrameCounter, MetricsSlot, PerformanceSnapshot, PointerPosition, SamplerHandle, ViewportSize};
pub use value::{ConsoleValue, HostObject, RenderError, ScriptError, render_args, render_value};
pub use window::{FetchFn, FetchFuture, FrameId, LogFn, MemoryInfo, MemorySource, Window, WindowBuilder, http_fetch};
