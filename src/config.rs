//! Connection configuration.
//!
//! The engine does no config-file parsing; the host hands it a built
//! [`PanelConfig`], including pre-computed entity inclusion arrays in
//! the [`ScanFilter`].

use crate::constants::{MAX_AREAS, MAX_KEYPADS, MAX_OUTPUTS, MAX_ZONES};

/// Pre-computed inclusion arrays, one slot per entity number
/// (slot 0 unused, matching the registry layout). Excluded entities
/// are skipped by the per-entity scan steps (voltage queries and
/// description lookups); bulk status reports still cover everything.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    zones: Vec<bool>,
    outputs: Vec<bool>,
    areas: Vec<bool>,
    keypads: Vec<bool>,
}

impl ScanFilter {
    /// Include every entity of every kind.
    pub fn all() -> Self {
        Self {
            zones: vec![true; usize::from(MAX_ZONES) + 1],
            outputs: vec![true; usize::from(MAX_OUTPUTS) + 1],
            areas: vec![true; usize::from(MAX_AREAS) + 1],
            keypads: vec![true; usize::from(MAX_KEYPADS) + 1],
        }
    }

    /// Replace the zone inclusion array. The array is resized to
    /// `MAX_ZONES + 1`; missing entries default to excluded.
    pub fn with_zones(mut self, included: Vec<bool>) -> Self {
        self.zones = resize(included, usize::from(MAX_ZONES) + 1);
        self
    }

    pub fn with_outputs(mut self, included: Vec<bool>) -> Self {
        self.outputs = resize(included, usize::from(MAX_OUTPUTS) + 1);
        self
    }

    pub fn with_areas(mut self, included: Vec<bool>) -> Self {
        self.areas = resize(included, usize::from(MAX_AREAS) + 1);
        self
    }

    pub fn with_keypads(mut self, included: Vec<bool>) -> Self {
        self.keypads = resize(included, usize::from(MAX_KEYPADS) + 1);
        self
    }

    pub fn zone_included(&self, number: u16) -> bool {
        self.zones.get(usize::from(number)).copied().unwrap_or(false)
    }

    pub fn output_included(&self, number: u16) -> bool {
        self.outputs
            .get(usize::from(number))
            .copied()
            .unwrap_or(false)
    }

    pub fn area_included(&self, number: u8) -> bool {
        self.areas.get(usize::from(number)).copied().unwrap_or(false)
    }

    pub fn keypad_included(&self, number: u8) -> bool {
        self.keypads
            .get(usize::from(number))
            .copied()
            .unwrap_or(false)
    }
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::all()
    }
}

fn resize(mut v: Vec<bool>, len: usize) -> Vec<bool> {
    v.resize(len, false);
    v
}

/// Configuration for connecting to an Elk M1 panel.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Panel address, `host:port` for the M1XEP ethernet interface
    /// (default non-secure port 2101).
    pub address: String,
    /// User code for arm/disarm and bypass commands, up to 6 digits.
    pub user_code: String,
    /// How long to wait for each request's reply.
    pub reply_timeout_ms: u64,
    /// How many times a timed-out scan step is retried before that
    /// step is reported failed. 0 disables retries.
    pub scan_retry_limit: u32,
    /// Auto-dispatch drain interval.
    pub dispatch_tick_ms: u64,
    /// Whether to run a full rescan immediately after connecting.
    pub rescan_on_connect: bool,
    /// Base delay for exponential backoff between connection attempts.
    pub reconnect_delay_ms: u64,
    /// Maximum number of connection retries on transient errors.
    pub max_connect_retries: u32,
    /// Entity inclusion arrays supplied by the host.
    pub scan_filter: ScanFilter,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            address: "192.168.0.251:2101".to_string(),
            user_code: String::new(),
            reply_timeout_ms: 5000,
            scan_retry_limit: 1,
            dispatch_tick_ms: 100,
            rescan_on_connect: true,
            reconnect_delay_ms: 10000,
            max_connect_retries: 3,
            scan_filter: ScanFilter::all(),
        }
    }
}

impl PanelConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> PanelConfigBuilder {
        PanelConfigBuilder::default()
    }
}

/// Builder for PanelConfig.
#[derive(Debug, Clone, Default)]
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn user_code(mut self, code: impl Into<String>) -> Self {
        self.config.user_code = code.into();
        self
    }

    pub fn reply_timeout_ms(mut self, ms: u64) -> Self {
        self.config.reply_timeout_ms = ms;
        self
    }

    pub fn scan_retry_limit(mut self, retries: u32) -> Self {
        self.config.scan_retry_limit = retries;
        self
    }

    pub fn dispatch_tick_ms(mut self, ms: u64) -> Self {
        self.config.dispatch_tick_ms = ms;
        self
    }

    pub fn rescan_on_connect(mut self, rescan: bool) -> Self {
        self.config.rescan_on_connect = rescan;
        self
    }

    pub fn reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.config.reconnect_delay_ms = ms;
        self
    }

    pub fn max_connect_retries(mut self, retries: u32) -> Self {
        self.config.max_connect_retries = retries;
        self
    }

    pub fn scan_filter(mut self, filter: ScanFilter) -> Self {
        self.config.scan_filter = filter;
        self
    }

    pub fn build(self) -> PanelConfig {
        self.config
    }
}
