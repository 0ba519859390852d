//! Risk-snapshot computation: the `RiskMonitor` collaborator (§6, §4.3).
//!
//! VaR/CVaR are derived from a simple parametric model over expected loss
//! (the loss distribution shape is an internal risk-model detail the spec
//! leaves to the implementer — §1 scopes out "the quote/premium arithmetic"
//! but the RiskSnapshot *shape* and the alert thresholds are the public
//! contract this module has to honor).

use async_trait::async_trait;
use insure_core::{
    AlertKind, AlertSeverity, PolicyStatus, ProductKey, RiskAlert, RiskSnapshot, TopProduct, UnifiedPool,
};
use insure_state::{StateResult, RiskMonitor};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;

use crate::limits::RiskLimits;

/// Normal-approximation VaR/CVaR z-scores against `expected_loss` as the
/// loss distribution's mean.
const Z_95: f64 = 1.645;
const Z_99: f64 = 2.326;
const CVAR_95_MULTIPLIER: f64 = 2.063;

pub struct DefaultRiskMonitor {
    limits: RiskLimits,
}

impl DefaultRiskMonitor {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    fn expected_loss(pool: &UnifiedPool) -> f64 {
        pool.active_policies
            .iter()
            .filter(|p| p.is_active())
            .map(|p| {
                let (trigger_rate, severity_pct) = p.product.coverage_kind.hedge_rates();
                let rate = (trigger_rate * severity_pct).to_f64().unwrap_or(0.0_f64);
                p.coverage_amount.0 as f64 * rate
            })
            .sum()
    }

    fn top_products(pool: &UnifiedPool) -> Vec<TopProduct> {
        let mut by_product: HashMap<ProductKey, (i64, u32)> = HashMap::new();
        for policy in pool.active_policies.iter().filter(|p| p.is_active()) {
            let entry = by_product.entry(policy.product).or_insert((0, 0));
            entry.0 += policy.coverage_amount.0;
            entry.1 += 1;
        }
        let mut products: Vec<TopProduct> = by_product
            .into_iter()
            .map(|(product, (exposure, count))| TopProduct {
                product,
                exposure_usd: insure_core::Cents::new(exposure),
                policy_count: count,
            })
            .collect();
        products.sort_by(|a, b| {
            b.exposure_usd
                .0
                .cmp(&a.exposure_usd.0)
                .then_with(|| format!("{:?}", a.product).cmp(&format!("{:?}", b.product)))
        });
        products.truncate(10);
        products
    }

    fn alerts(&self, ltv: f64, reserve_ratio: f64, max_concentration: f64, var_95: f64, now: i64) -> Vec<RiskAlert> {
        let mut alerts = Vec::new();
        if ltv > self.limits.max_ltv {
            alerts.push(RiskAlert {
                alert_kind: AlertKind::LtvBreach,
                severity: AlertSeverity::High,
                message: format!("ltv {ltv:.4} exceeds limit {:.4}", self.limits.max_ltv),
                current_value: ltv,
                limit_value: self.limits.max_ltv,
                timestamp: now,
            });
        }
        if reserve_ratio < self.limits.min_reserve_ratio {
            alerts.push(RiskAlert {
                alert_kind: AlertKind::ReserveLow,
                severity: AlertSeverity::High,
                message: format!(
                    "reserve ratio {reserve_ratio:.4} below minimum {:.4}",
                    self.limits.min_reserve_ratio
                ),
                current_value: reserve_ratio,
                limit_value: self.limits.min_reserve_ratio,
                timestamp: now,
            });
        }
        if max_concentration > self.limits.max_concentration {
            alerts.push(RiskAlert {
                alert_kind: AlertKind::ConcentrationHigh,
                severity: AlertSeverity::Medium,
                message: format!(
                    "product concentration {max_concentration:.4} exceeds limit {:.4}",
                    self.limits.max_concentration
                ),
                current_value: max_concentration,
                limit_value: self.limits.max_concentration,
                timestamp: now,
            });
        }
        if var_95 > self.limits.max_var_95 {
            alerts.push(RiskAlert {
                alert_kind: AlertKind::VarBreach,
                severity: AlertSeverity::Critical,
                message: format!("VaR(95) {var_95:.4} exceeds limit {:.4}", self.limits.max_var_95),
                current_value: var_95,
                limit_value: self.limits.max_var_95,
                timestamp: now,
            });
        }
        alerts
    }
}

#[async_trait]
impl RiskMonitor for DefaultRiskMonitor {
    async fn calculate_snapshot(&self, pool: &UnifiedPool) -> StateResult<RiskSnapshot> {
        let now = chrono::Utc::now().timestamp();
        let capital = pool.total_capital_usd.0.max(1) as f64;
        let coverage = pool.total_coverage_sold.0 as f64;

        let expected_loss = Self::expected_loss(pool);
        let var_95 = (expected_loss * Z_95) / capital;
        let var_99 = (expected_loss * Z_99) / capital;
        let cvar_95 = (expected_loss * CVAR_95_MULTIPLIER) / capital;
        let ltv = coverage / capital;
        let reserve_ratio = 1.0 - ltv;

        let top_products = Self::top_products(pool);
        let max_concentration = if coverage > 0.0 {
            top_products
                .first()
                .map(|p| p.exposure_usd.0 as f64 / coverage)
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let alerts = self.alerts(ltv, reserve_ratio, max_concentration, var_95, now);
        let (breach_alerts, warning_alerts): (Vec<_>, Vec<_>) = alerts
            .into_iter()
            .partition(|a| matches!(a.severity, AlertSeverity::Critical | AlertSeverity::High));

        Ok(RiskSnapshot {
            var_95,
            var_99,
            cvar_95,
            expected_loss: expected_loss / capital,
            ltv,
            reserve_ratio,
            max_concentration,
            breach_alerts,
            warning_alerts,
            top_10_products: top_products,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insure_core::{Cents, Chain, CoverageKind, Policy, Price, ProductKey, Stablecoin};
    use rust_decimal_macros::dec;

    fn policy(id: u64, kind: CoverageKind, coverage: i64) -> Policy {
        Policy {
            id,
            holder: "0xabc".into(),
            beneficiary: None,
            product: ProductKey::new(kind, Chain::Ethereum, Stablecoin::Usdc),
            coverage_amount: Cents::new(coverage),
            premium_paid: Cents::new(100),
            trigger_price: Price::new(dec!(0.98)),
            floor_price: Price::new(dec!(0.90)),
            start_time: 0,
            expiry_time: 1_000_000,
            status: PolicyStatus::Active,
            payout_amount: None,
            payout_time: None,
        }
    }

    #[tokio::test]
    async fn snapshot_has_no_alerts_for_healthy_pool() {
        let mut pool = UnifiedPool::new(Cents::new(10_000_000));
        pool.active_policies.push(policy(1, CoverageKind::Depeg, 100_000));
        pool.total_coverage_sold = Cents::new(100_000);

        let monitor = DefaultRiskMonitor::new(RiskLimits::default());
        let snapshot = monitor.calculate_snapshot(&pool).await.unwrap();
        assert!(snapshot.breach_alerts.is_empty());
        assert_eq!(snapshot.top_10_products.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_flags_ltv_breach_near_full_utilization() {
        let mut pool = UnifiedPool::new(Cents::new(1_000_000));
        pool.active_policies.push(policy(1, CoverageKind::Bridge, 950_000));
        pool.total_coverage_sold = Cents::new(950_000);

        let monitor = DefaultRiskMonitor::new(RiskLimits::default());
        let snapshot = monitor.calculate_snapshot(&pool).await.unwrap();
        assert!(snapshot
            .breach_alerts
            .iter()
            .any(|a| matches!(a.alert_kind, AlertKind::LtvBreach)));
    }

    #[tokio::test]
    async fn top_products_ordered_by_exposure_descending() {
        let mut pool = UnifiedPool::new(Cents::new(10_000_000));
        pool.active_policies.push(policy(1, CoverageKind::Depeg, 50_000));
        pool.active_policies.push(policy(2, CoverageKind::Bridge, 200_000));
        pool.total_coverage_sold = Cents::new(250_000);

        let monitor = DefaultRiskMonitor::new(RiskLimits::default());
        let snapshot = monitor.calculate_snapshot(&pool).await.unwrap();
        assert_eq!(snapshot.top_10_products[0].product.coverage_kind, CoverageKind::Bridge);
    }
}
