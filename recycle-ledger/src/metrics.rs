//! Metrics collection for observability
//!
//! Prometheus collectors for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_deposits_total` - Deposits recorded, labeled by material
//! - `ledger_rewards_paid_units` - Reward credited, in token units
//! - `ledger_withdrawals_total` - Completed withdrawals
//! - `ledger_badges_total` - Badges created so far
//! - `ledger_treasury_units` - Current treasury level, in token units
//! - `ledger_op_duration_seconds` - Histogram of operation latencies

use crate::types::{Amount, Material};
use prometheus::{
    Counter, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

/// Metrics collector
///
/// Each instance owns its registry so independent ledgers (and tests) never
/// collide on collector names.
#[derive(Clone)]
pub struct Metrics {
    /// Deposits recorded, by material
    pub deposits_total: IntCounterVec,

    /// Reward credited, in token units
    pub rewards_paid_units: Counter,

    /// Completed withdrawals
    pub withdrawals_total: IntCounter,

    /// Badges created
    pub badges_total: IntGauge,

    /// Treasury level, in token units
    pub treasury_units: Gauge,

    /// Operation latency histogram
    pub op_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deposits_total = IntCounterVec::new(
            Opts::new("ledger_deposits_total", "Deposits recorded, by material"),
            &["material"],
        )?;
        registry.register(Box::new(deposits_total.clone()))?;

        let rewards_paid_units = Counter::with_opts(Opts::new(
            "ledger_rewards_paid_units",
            "Reward credited, in token units",
        ))?;
        registry.register(Box::new(rewards_paid_units.clone()))?;

        let withdrawals_total = IntCounter::with_opts(Opts::new(
            "ledger_withdrawals_total",
            "Completed withdrawals",
        ))?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let badges_total =
            IntGauge::with_opts(Opts::new("ledger_badges_total", "Badges created so far"))?;
        registry.register(Box::new(badges_total.clone()))?;

        let treasury_units = Gauge::with_opts(Opts::new(
            "ledger_treasury_units",
            "Current treasury level, in token units",
        ))?;
        registry.register(Box::new(treasury_units.clone()))?;

        let op_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_op_duration_seconds",
                "Histogram of operation latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(op_duration.clone()))?;

        Ok(Self {
            deposits_total,
            rewards_paid_units,
            withdrawals_total,
            badges_total,
            treasury_units,
            op_duration,
            registry,
        })
    }

    /// Record a successful material deposit
    pub fn record_deposit(&self, material: Material, reward: Amount) {
        self.deposits_total.with_label_values(&[material.code()]).inc();
        self.rewards_paid_units.inc_by(reward.units_lossy());
    }

    /// Record a manual reward credit
    pub fn record_reward(&self, amount: Amount) {
        self.rewards_paid_units.inc_by(amount.units_lossy());
    }

    /// Record a completed withdrawal
    pub fn record_withdrawal(&self) {
        self.withdrawals_total.inc();
    }

    /// Record badge creation
    pub fn record_badge_created(&self, total: u64) {
        self.badges_total.set(total as i64);
    }

    /// Update treasury gauge
    pub fn update_treasury(&self, treasury: Amount) {
        self.treasury_units.set(treasury.units_lossy());
    }

    /// Record operation duration
    pub fn record_op_duration(&self, duration_seconds: f64) {
        self.op_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.withdrawals_total.get(), 0);
        assert_eq!(metrics.badges_total.get(), 0);
    }

    #[test]
    fn test_registries_independent() {
        // Two collectors must not collide on names
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_withdrawal();
        assert_eq!(a.withdrawals_total.get(), 1);
        assert_eq!(b.withdrawals_total.get(), 0);
    }

    #[test]
    fn test_record_deposit() {
        let metrics = Metrics::new().unwrap();
        metrics.record_deposit(Material::Plastic, Amount::from_wei(crate::types::WEI_PER_UNIT));
        metrics.record_deposit(Material::Plastic, Amount::ZERO);
        metrics.record_deposit(Material::Glass, Amount::ZERO);

        assert_eq!(
            metrics.deposits_total.with_label_values(&["plastic"]).get(),
            2
        );
        assert_eq!(metrics.deposits_total.with_label_values(&["glass"]).get(), 1);
        assert!((metrics.rewards_paid_units.get() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_treasury() {
        let metrics = Metrics::new().unwrap();
        metrics.update_treasury(Amount::from_wei(crate::types::WEI_PER_UNIT / 2));
        assert!((metrics.treasury_units.get() - 0.5).abs() < 1e-9);
    }
}
