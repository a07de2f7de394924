use serde::{Deserialize, Serialize};

/// One balance band of the lot-size table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskTier {
    pub balance_low: f64,
    pub balance_high: f64,
    pub min_lot: f64,
    pub max_lot: f64,
    pub max_cumulative_lot: f64,
}

/// Contiguous bands from a $30 floor to infinity. A balance below the floor
/// falls back to the smallest tier.
pub fn default_risk_tiers() -> Vec<RiskTier> {
    let bands = [
        (30.0, 100.0, 0.01, 0.03, 0.04),
        (100.0, 200.0, 0.02, 0.05, 0.07),
        (200.0, 400.0, 0.04, 0.06, 0.10),
        (400.0, 700.0, 0.05, 0.10, 0.15),
        (700.0, 1100.0, 0.07, 0.16, 0.20),
        (1100.0, f64::INFINITY, 0.08, 0.17, 0.25),
    ];
    bands
        .iter()
        .map(
            |&(balance_low, balance_high, min_lot, max_lot, max_cumulative_lot)| RiskTier {
                balance_low,
                balance_high,
                min_lot,
                max_lot,
                max_cumulative_lot,
            },
        )
        .collect()
}

/// Ordered-band lookup: balance -> lot bounds. The cumulative cap is reported
/// here but enforced by the order-placement collaborator.
pub fn size_lots(tiers: &[RiskTier], balance: f64) -> RiskTier {
    tiers
        .iter()
        .find(|t| balance >= t.balance_low && balance < t.balance_high)
        .copied()
        .unwrap_or_else(|| tiers[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_floor_falls_back_to_smallest() {
        let tiers = default_risk_tiers();
        let t = size_lots(&tiers, 5.0);
        assert!((t.min_lot - 0.01).abs() < 1e-9);
        assert!((t.max_lot - 0.03).abs() < 1e-9);
    }

    #[test]
    fn band_boundaries() {
        let tiers = default_risk_tiers();
        // Lower bound inclusive, upper bound exclusive
        assert!((size_lots(&tiers, 100.0).min_lot - 0.02).abs() < 1e-9);
        assert!((size_lots(&tiers, 99.99).min_lot - 0.01).abs() < 1e-9);
        assert!((size_lots(&tiers, 1100.0).min_lot - 0.08).abs() < 1e-9);
    }

    #[test]
    fn huge_balance_matches_top_tier() {
        let tiers = default_risk_tiers();
        let t = size_lots(&tiers, 1_000_000.0);
        assert!((t.max_cumulative_lot - 0.25).abs() < 1e-9);
    }

    #[test]
    fn tiers_ordered_and_internally_consistent() {
        let tiers = default_risk_tiers();
        for t in &tiers {
            assert!(t.min_lot <= t.max_lot);
            assert!(t.max_lot <= t.max_cumulative_lot);
        }
        for pair in tiers.windows(2) {
            // Contiguous and monotonically non-decreasing in all lot fields
            assert!((pair[0].balance_high - pair[1].balance_low).abs() < 1e-9);
            assert!(pair[0].min_lot <= pair[1].min_lot);
            assert!(pair[0].max_lot <= pair[1].max_lot);
            assert!(pair[0].max_cumulative_lot <= pair[1].max_cumulative_lot);
        }
    }
}
