//! Overlay lifecycle
//!
//! `Overlay` owns one mount of the interception layer and the performance
//! sampler against a window, plus the capture buffer they feed. Everything it
//! exposes to a presentation layer is read-only, apart from which records are
//! expanded.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::buffer::{CaptureBuffer, CaptureSink, RecordStore, RingStore, UnboundedStore};
use crate::config::OverlayConfig;
use crate::intercept::{self, InstallError, Installation};
use crate::record::EventRecord;
use crate::sampler::{self, MetricsSlot, PerformanceSnapshot, SamplerHandle};
use crate::window::Window;

/// Overlay lifecycle error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("Overlay is already mounted")]
    AlreadyMounted,
    #[error(transparent)]
    Install(#[from] InstallError),
}

struct Mounted {
    window: Rc<Window>,
    buffer: Rc<CaptureBuffer>,
    metrics: Rc<MetricsSlot>,
    // torn down in this order: sampler first, then interception
    sampler: SamplerHandle,
    installation: Installation,
}

/// Diagnostic overlay
pub struct Overlay {
    config: OverlayConfig,
    mounted: Option<Mounted>,
    // sequence numbers (position + evicted count), stable across eviction
    expanded: BTreeSet<u64>,
}

impl Overlay {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            mounted: None,
            expanded: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Wrap the window's console and fetch and start sampling.
    ///
    /// Each mount starts with an empty buffer.
    pub fn mount(&mut self, window: &Rc<Window>) -> Result<(), OverlayError> {
        if self.mounted.is_some() {
            return Err(OverlayError::AlreadyMounted);
        }

        let store: Box<dyn RecordStore> = match self.config.capacity {
            Some(capacity) => Box::new(RingStore::new(capacity)),
            None => Box::new(UnboundedStore::new()),
        };
        let buffer = Rc::new(CaptureBuffer::with_store(store));
        let sink: Rc<dyn CaptureSink> = buffer.clone();

        let installation = intercept::install(window, Rc::downgrade(&sink), &self.config)?;

        let metrics = Rc::new(MetricsSlot::new());
        let sampler = sampler::start(window, metrics.clone(), self.config.sample_interval_ms);

        self.mounted = Some(Mounted {
            window: window.clone(),
            buffer,
            metrics,
            sampler,
            installation,
        });
        tracing::info!(capacity = ?self.config.capacity, "overlay mounted");
        Ok(())
    }

    /// Stop sampling, restore the window and discard captured records.
    /// No-op when not mounted.
    pub fn unmount(&mut self) {
        let Some(mounted) = self.mounted.take() else {
            return;
        };

        mounted.sampler.cancel();
        mounted.installation.teardown();
        self.expanded.clear();
        tracing::info!(records = mounted.buffer.len(), "overlay unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// Copy of the captured records, oldest first
    pub fn records(&self) -> Vec<EventRecord> {
        self.mounted
            .as_ref()
            .map(|m| m.buffer.snapshot())
            .unwrap_or_default()
    }

    /// Iterate the captured records without copying them
    pub fn with_records<R>(&self, f: impl FnOnce(&mut dyn Iterator<Item = &EventRecord>) -> R) -> R {
        match &self.mounted {
            Some(mounted) => mounted.buffer.with_records(f),
            None => f(&mut std::iter::empty::<&EventRecord>()),
        }
    }

    pub fn record_count(&self) -> usize {
        self.mounted.as_ref().map_or(0, |m| m.buffer.len())
    }

    /// Latest metrics; all zero when not mounted
    pub fn metrics(&self) -> PerformanceSnapshot {
        self.mounted
            .as_ref()
            .map(|m| m.metrics.get())
            .unwrap_or_default()
    }

    /// `name@version` for each dependency the page registers
    pub fn third_party_libraries(&self) -> Vec<String> {
        let Some(mounted) = &self.mounted else {
            return Vec::new();
        };
        mounted
            .window
            .dependencies()
            .map(|deps| {
                deps.iter()
                    .map(|(name, version)| format!("{}@{}", name, version))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.mounted.as_ref().map(|m| m.window.user_agent())
    }

    /// Flip whether record `index` shows its details; returns the new state.
    ///
    /// The state follows the record, not the position: once older records
    /// are evicted it is reported at the record's new index, and it is
    /// forgotten when the record itself is evicted.
    pub fn toggle_expanded(&mut self, index: usize) -> bool {
        let evicted = self.evicted();
        self.expanded.retain(|&seq| seq >= evicted);

        let seq = evicted + index as u64;
        if self.expanded.remove(&seq) {
            false
        } else {
            self.expanded.insert(seq);
            true
        }
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.contains(&(self.evicted() + index as u64))
    }

    fn evicted(&self) -> u64 {
        self.mounted.as_ref().map_or(0, |m| m.buffer.evicted())
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::value::ConsoleValue;

    fn quiet_window() -> Rc<Window> {
        Window::builder()
            .clock(Rc::new(ManualClock::new(0)))
            .console_log(Rc::new(|_: &[ConsoleValue]| {}))
            .dependency("react", "18.2.0")
            .dependency("lodash", "4.17.21")
            .build()
    }

    #[test]
    fn test_mount_twice_is_rejected() {
        let window = quiet_window();
        let mut overlay = Overlay::default();
        overlay.mount(&window).unwrap();
        assert_eq!(overlay.mount(&window), Err(OverlayError::AlreadyMounted));
    }

    #[test]
    fn test_second_overlay_on_same_window() {
        let window = quiet_window();
        let mut first = Overlay::default();
        let mut second = Overlay::default();
        first.mount(&window).unwrap();

        assert_eq!(
            second.mount(&window),
            Err(OverlayError::Install(InstallError::AlreadyInstalled))
        );
        assert!(!second.is_mounted());
        // the failed mount must not leave a sampler behind
        assert_eq!(window.pending_frames(), 1);
    }

    #[test]
    fn test_remount_starts_empty() {
        let window = quiet_window();
        let mut overlay = Overlay::default();
        overlay.mount(&window).unwrap();
        window.console_log(&["first".into()]);
        assert_eq!(overlay.record_count(), 1);

        overlay.unmount();
        assert_eq!(overlay.record_count(), 0);
        overlay.mount(&window).unwrap();
        assert_eq!(overlay.record_count(), 0);
    }

    #[test]
    fn test_capacity_selects_ring_store() {
        let window = quiet_window();
        let mut overlay = Overlay::new(OverlayConfig::builder().capacity(2).build());
        overlay.mount(&window).unwrap();

        for i in 0..5 {
            window.console_log(&[i.into()]);
        }
        let messages: Vec<String> = overlay.records().iter().map(|r| r.message().to_string()).collect();
        assert_eq!(messages, ["3", "4"]);
    }

    #[test]
    fn test_expanded_state_follows_record_through_eviction() {
        let window = quiet_window();
        let mut overlay = Overlay::new(OverlayConfig::builder().capacity(3).build());
        overlay.mount(&window).unwrap();

        for m in ["a", "b", "c"] {
            window.console_log(&[m.into()]);
        }
        assert!(overlay.toggle_expanded(2));

        window.console_log(&["d".into()]);
        // "c" moved from index 2 to index 1
        assert!(overlay.is_expanded(1));
        assert!(!overlay.is_expanded(2));

        window.console_log(&["e".into()]);
        window.console_log(&["f".into()]);
        window.console_log(&["g".into()]);
        // "c" is gone; nothing shows as expanded
        assert!((0..3).all(|i| !overlay.is_expanded(i)));
    }

    #[test]
    fn test_third_party_libraries() {
        let window = quiet_window();
        let mut overlay = Overlay::default();
        assert!(overlay.third_party_libraries().is_empty());

        overlay.mount(&window).unwrap();
        assert_eq!(overlay.third_party_libraries(), ["react@18.2.0", "lodash@4.17.21"]);
    }

    #[test]
    fn test_toggle_expanded() {
        let mut overlay = Overlay::default();
        assert!(overlay.toggle_expanded(3));
        assert!(overlay.is_expanded(3));
        assert!(!overlay.toggle_expanded(3));
        assert!(!overlay.is_expanded(3));
    }

    #[test]
    fn test_drop_unmounts() {
        let window = quiet_window();
        let log = window.console_log_fn();
        {
            let mut overlay = Overlay::default();
            overlay.mount(&window).unwrap();
        }
        assert!(Rc::ptr_eq(&window.console_log_fn(), &log));
        assert_eq!(window.pending_frames(), 0);
        assert_eq!(window.listener_count(), 0);
    }
}
