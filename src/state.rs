use crate::config::AppConfig;
use crate::models::black_scholes::BlackScholes;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Request Counters (lock-free) ──

pub struct RequestCounters {
    pub prices_computed: AtomicU64,
    pub evaluations: AtomicU64,
    pub curves_built: AtomicU64,
    pub curve_points_sampled: AtomicU64,
    pub closings_resolved: AtomicU64,
    pub summaries_built: AtomicU64,
    pub requests_rejected: AtomicU64,
}

impl RequestCounters {
    pub fn new() -> Self {
        Self {
            prices_computed: AtomicU64::new(0),
            evaluations: AtomicU64::new(0),
            curves_built: AtomicU64::new(0),
            curve_points_sampled: AtomicU64::new(0),
            closings_resolved: AtomicU64::new(0),
            summaries_built: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for RequestCounters {
    fn default() -> Self {
        Self::new()
    }
}

// ── Application shared state (immutable apart from the counters) ──

pub struct AppState {
    pub config: AppConfig,
    /// Stateless model shared by every handler
    pub model: BlackScholes,
    pub counters: RequestCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            model: BlackScholes::new(),
            counters: RequestCounters::new(),
        })
    }
}
