//! Performance sampler
//!
//! Frame-driven loop measuring fps, plus pointer and resize listeners. The
//! loop re-requests itself every display frame and flushes fps, memory and
//! viewport figures once per sample interval. Pointer position and viewport
//! size also update immediately on their events.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::events::{EventType, ListenerId, Phase, WindowEvent};
use crate::window::{FrameId, Window};

/// Shortest sample interval; anything below is raised to this
pub const MIN_SAMPLE_INTERVAL_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// Latest live metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub fps: u32,
    pub memory_used: u64,
    pub memory_total: u64,
    pub pointer_position: PointerPosition,
    pub viewport_size: ViewportSize,
}

/// Single current snapshot, overwritten in place
#[derive(Debug, Default)]
pub struct MetricsSlot {
    snapshot: Cell<PerformanceSnapshot>,
}

impl MetricsSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> PerformanceSnapshot {
        self.snapshot.get()
    }

    pub fn update(&self, f: impl FnOnce(&mut PerformanceSnapshot)) {
        let mut snapshot = self.snapshot.get();
        f(&mut snapshot);
        self.snapshot.set(snapshot);
    }
}

/// Frame counter flushed once per interval
#[derive(Debug, Clone)]
pub struct FrameCounter {
    frame_count: u32,
    last_flush: f64,
    interval_ms: f64,
}

impl FrameCounter {
    pub fn new(start: f64, interval_ms: f64) -> Self {
        Self {
            frame_count: 0,
            last_flush: start,
            interval_ms: interval_ms.max(MIN_SAMPLE_INTERVAL_MS),
        }
    }

    /// Count one frame at `now`; returns fps once the interval has elapsed
    pub fn tick(&mut self, now: f64) -> Option<u32> {
        self.frame_count += 1;
        let elapsed = now - self.last_flush;
        if elapsed < self.interval_ms {
            return None;
        }

        let fps = (f64::from(self.frame_count) * 1000.0 / elapsed).round() as u32;
        self.frame_count = 0;
        self.last_flush = now;
        Some(fps)
    }
}

struct SamplerState {
    window: Weak<Window>,
    metrics: Rc<MetricsSlot>,
    counter: RefCell<FrameCounter>,
    pending: Cell<Option<FrameId>>,
    cancelled: Cell<bool>,
}

impl SamplerState {
    fn on_frame(self: &Rc<Self>, now: f64) {
        if self.cancelled.get() {
            return;
        }
        let Some(window) = self.window.upgrade() else {
            return;
        };

        let flushed = self.counter.borrow_mut().tick(now);
        if let Some(fps) = flushed {
            let memory = window.memory_info();
            let (width, height) = window.inner_size();
            self.metrics.update(|s| {
                s.fps = fps;
                s.memory_used = memory.used_js_heap_size;
                s.memory_total = memory.total_js_heap_size;
                s.viewport_size = ViewportSize { width, height };
            });
            tracing::trace!(fps, "performance sample");
        }

        let state = self.clone();
        let id = window.request_animation_frame(Box::new(move |now| state.on_frame(now)));
        self.pending.set(Some(id));
    }
}

/// Running sampler. Cancelled exactly once, on `cancel` or drop.
pub struct SamplerHandle {
    state: Rc<SamplerState>,
    pointer_listener: ListenerId,
    resize_listener: ListenerId,
}

/// Start sampling `window` into `metrics`
pub fn start(window: &Rc<Window>, metrics: Rc<MetricsSlot>, interval_ms: f64) -> SamplerHandle {
    let (width, height) = window.inner_size();
    metrics.update(|s| s.viewport_size = ViewportSize { width, height });

    let pointer_metrics = metrics.clone();
    let pointer_listener = window.add_event_listener(
        EventType::PointerMove,
        Phase::Bubble,
        Rc::new(move |event: &WindowEvent| {
            if let WindowEvent::PointerMove { x, y } = *event {
                pointer_metrics.update(|s| s.pointer_position = PointerPosition { x, y });
            }
        }),
    );

    let resize_metrics = metrics.clone();
    let resize_window = Rc::downgrade(window);
    let resize_listener = window.add_event_listener(
        EventType::Resize,
        Phase::Bubble,
        Rc::new(move |event: &WindowEvent| {
            if !matches!(event, WindowEvent::Resize { .. }) {
                return;
            }
            if let Some(window) = resize_window.upgrade() {
                let (width, height) = window.inner_size();
                resize_metrics.update(|s| s.viewport_size = ViewportSize { width, height });
            }
        }),
    );

    let state = Rc::new(SamplerState {
        window: Rc::downgrade(window),
        metrics,
        counter: RefCell::new(FrameCounter::new(window.clock().now(), interval_ms)),
        pending: Cell::new(None),
        cancelled: Cell::new(false),
    });

    // first sample runs synchronously and schedules the next frame
    state.on_frame(window.clock().now());

    tracing::debug!(interval_ms, "performance sampler started");

    SamplerHandle {
        state,
        pointer_listener,
        resize_listener,
    }
}

impl SamplerHandle {
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    /// Stop the loop and remove the listeners
    pub fn cancel(&self) {
        if self.state.cancelled.replace(true) {
            return;
        }
        let Some(window) = self.state.window.upgrade() else {
            return;
        };
        if let Some(id) = self.state.pending.take() {
            window.cancel_animation_frame(id);
        }
        window.remove_event_listener(self.pointer_listener);
        window.remove_event_listener(self.resize_listener);
        tracing::debug!("performance sampler cancelled");
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::window::{MemoryInfo, MemorySource};

    struct FixedMemory;

    impl MemorySource for FixedMemory {
        fn memory_info(&self) -> Option<MemoryInfo> {
            Some(MemoryInfo {
                used_js_heap_size: 8 * 1024 * 1024,
                total_js_heap_size: 16 * 1024 * 1024,
            })
        }
    }

    #[test]
    fn test_sixty_frames_in_one_second() {
        let mut counter = FrameCounter::new(0.0, 1000.0);
        let mut result = None;
        for i in 1..=60 {
            result = counter.tick(f64::from(i) * 1000.0 / 60.0);
            if i < 60 {
                assert_eq!(result, None);
            }
        }
        assert_eq!(result, Some(60));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let mut counter = FrameCounter::new(0.0, 0.0);
        assert_eq!(counter.tick(0.0), None);
        assert_eq!(counter.tick(1.0), Some(2000));

        let mut negative = FrameCounter::new(0.0, -5.0);
        assert_eq!(negative.tick(0.0), None);
        assert_eq!(negative.tick(0.5), None);
        assert_eq!(negative.tick(2.0), Some(1500));
    }

    #[test]
    fn test_counter_resets_after_flush() {
        let mut counter = FrameCounter::new(0.0, 1000.0);
        assert_eq!(counter.tick(1000.0), Some(1));
        assert_eq!(counter.tick(1500.0), None);
        assert_eq!(counter.tick(2000.0), Some(2));
    }

    #[test]
    fn test_fps_rounds() {
        let mut counter = FrameCounter::new(0.0, 1000.0);
        for _ in 0..29 {
            counter.tick(500.0);
        }
        // 30 frames over 1200ms = 25
        assert_eq!(counter.tick(1200.0), Some(25));
    }

    #[test]
    fn test_sampler_flushes_memory_and_viewport() {
        let clock = Rc::new(ManualClock::new(0));
        let window = Window::builder()
            .clock(clock.clone())
            .memory(Rc::new(FixedMemory))
            .inner_size(800, 600)
            .build();
        let metrics = Rc::new(MetricsSlot::new());
        let _handle = start(&window, metrics.clone(), 1000.0);

        assert_eq!(metrics.get().viewport_size, ViewportSize { width: 800, height: 600 });
        assert_eq!(metrics.get().memory_used, 0);

        window.set_inner_size(1024, 768);
        clock.advance(1000.0);
        window.run_frame();

        let snapshot = metrics.get();
        // the synchronous first frame plus this one
        assert_eq!(snapshot.fps, 2);
        assert_eq!(snapshot.memory_used, 8 * 1024 * 1024);
        assert_eq!(snapshot.memory_total, 16 * 1024 * 1024);
        assert_eq!(snapshot.viewport_size, ViewportSize { width: 1024, height: 768 });
    }

    #[test]
    fn test_loop_reschedules_every_frame() {
        let window = Window::builder().clock(Rc::new(ManualClock::new(0))).build();
        let _handle = start(&window, Rc::new(MetricsSlot::new()), 1000.0);

        for _ in 0..5 {
            assert_eq!(window.pending_frames(), 1);
            assert_eq!(window.run_frame(), 1);
        }
    }

    #[test]
    fn test_pointer_and_resize_update_immediately() {
        let window = Window::builder().clock(Rc::new(ManualClock::new(0))).build();
        let metrics = Rc::new(MetricsSlot::new());
        let _handle = start(&window, metrics.clone(), 1000.0);

        window.dispatch_event(&WindowEvent::PointerMove { x: 12.0, y: 34.0 });
        assert_eq!(metrics.get().pointer_position, PointerPosition { x: 12.0, y: 34.0 });

        window.set_inner_size(640, 480);
        window.dispatch_event(&WindowEvent::Resize { width: 640, height: 480 });
        assert_eq!(metrics.get().viewport_size, ViewportSize { width: 640, height: 480 });
    }

    #[test]
    fn test_cancel_is_idempotent_and_releases_everything() {
        let window = Window::builder().clock(Rc::new(ManualClock::new(0))).build();
        let listeners = window.listener_count();
        let handle = start(&window, Rc::new(MetricsSlot::new()), 1000.0);
        assert_eq!(window.listener_count(), listeners + 2);

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(window.pending_frames(), 0);
        assert_eq!(window.listener_count(), listeners);

        drop(handle);
        assert_eq!(window.run_frame(), 0);
    }
}
