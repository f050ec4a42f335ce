//! Metrics Collector

use prometheus::{IntCounter, IntGauge, Registry, TextEncoder};
use tracing::error;

/// Authentication counters exported in Prometheus text format
pub struct Metrics {
    prometheus_registry: Registry,

    registrations_total: IntCounter,
    login_attempts_total: IntCounter,
    login_failures_total: IntCounter,
    logouts_total: IntCounter,
    access_denied_total: IntCounter,
    active_sessions: IntGauge,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let prometheus_registry = Registry::new();

        let registrations_total = IntCounter::new(
            "sessiongate_registrations_total",
            "Total successful user registrations",
        )?;

        let login_attempts_total = IntCounter::new(
            "sessiongate_login_attempts_total",
            "Total login attempts",
        )?;

        let login_failures_total = IntCounter::new(
            "sessiongate_login_failures_total",
            "Total failed login attempts",
        )?;

        let logouts_total = IntCounter::new(
            "sessiongate_logouts_total",
            "Total sessions closed by logout",
        )?;

        let access_denied_total = IntCounter::new(
            "sessiongate_access_denied_total",
            "Total protected requests rejected for lack of a valid session",
        )?;

        let active_sessions = IntGauge::new(
            "sessiongate_active_sessions",
            "Number of live sessions",
        )?;

        prometheus_registry.register(Box::new(registrations_total.clone()))?;
        prometheus_registry.register(Box::new(login_attempts_total.clone()))?;
        prometheus_registry.register(Box::new(login_failures_total.clone()))?;
        prometheus_registry.register(Box::new(logouts_total.clone()))?;
        prometheus_registry.register(Box::new(access_denied_total.clone()))?;
        prometheus_registry.register(Box::new(active_sessions.clone()))?;

        Ok(Self {
            prometheus_registry,
            registrations_total,
            login_attempts_total,
            login_failures_total,
            logouts_total,
            access_denied_total,
            active_sessions,
        })
    }

    pub fn record_registration(&self) {
        self.registrations_total.inc();
    }

    /// Record a login attempt and its outcome
    pub fn record_login(&self, success: bool) {
        self.login_attempts_total.inc();
        if !success {
            self.login_failures_total.inc();
        }
    }

    pub fn record_logout(&self) {
        self.logouts_total.inc();
    }

    pub fn record_access_denied(&self) {
        self.access_denied_total.inc();
    }

    pub fn set_active_sessions(&self, count: usize) {
        self.active_sessions.set(count as i64);
    }

    pub fn get_login_attempts(&self) -> u64 {
        self.login_attempts_total.get()
    }

    pub fn get_login_failures(&self) -> u64 {
        self.login_failures_total.get()
    }

    pub fn get_access_denied(&self) -> u64 {
        self.access_denied_total.get()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.prometheus_registry.gather();

        match encoder.encode_to_string(&metric_families) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to encode Prometheus metrics");
                String::new()
            }
        }
    }
}
