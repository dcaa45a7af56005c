//! Overlay configuration

/// Overlay configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Maximum records kept (None = unbounded, never below 1)
    pub capacity: Option<usize>,
    /// Interval between fps/memory/viewport refreshes; raised to
    /// `sampler::MIN_SAMPLE_INTERVAL_MS` when smaller
    pub sample_interval_ms: f64,
    /// Keep a text copy of fetch response bodies
    pub capture_response_body: bool,
    /// Truncate captured bodies to this many bytes (None = whole body)
    pub max_body_bytes: Option<usize>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            sample_interval_ms: 1000.0,
            capture_response_body: true,
            max_body_bytes: None,
        }
    }
}

impl OverlayConfig {
    pub fn builder() -> OverlayConfigBuilder {
        OverlayConfigBuilder::new()
    }
}

/// Overlay configuration builder
#[derive(Debug, Default)]
pub struct OverlayConfigBuilder {
    config: OverlayConfig,
}

impl OverlayConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the buffer; 0 is raised to 1
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = Some(capacity.max(1));
        self
    }

    pub fn sample_interval_ms(mut self, ms: f64) -> Self {
        self.config.sample_interval_ms = ms;
        self
    }

    pub fn capture_response_body(mut self, enabled: bool) -> Self {
        self.config.capture_response_body = enabled;
        self
    }

    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config.max_body_bytes = Some(max);
        self
    }

    pub fn build(self) -> OverlayConfig {
        self.config
    }
}
