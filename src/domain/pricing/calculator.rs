//! Travel cost calculation

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::money::{Money, micros_from_euros};
use super::profile::{CostConditions, PricingProfile, SupplementKind};

/// Default per-km rate applied to misconfigured profiles
pub const DEFAULT_FALLBACK_RATE_PER_KM: f64 = 0.50;

/// One surcharge that contributed to a cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSupplement {
    pub kind: SupplementKind,
    pub amount: Money,
}

/// Itemised travel cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub billable_km: u64,
    pub base: Money,
    pub distance: Money,
    pub supplements: Vec<AppliedSupplement>,
    pub total: Money,
}

/// Turns a distance and a pricing profile into money
#[derive(Debug, Clone)]
pub struct TravelCostCalculator {
    fallback: PricingProfile,
}

impl Default for TravelCostCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_RATE_PER_KM)
    }
}

impl TravelCostCalculator {
    pub fn new(fallback_rate_per_km: f64) -> Self {
        Self {
            fallback: PricingProfile::flat(micros_from_euros(fallback_rate_per_km.max(0.0))),
        }
    }

    /// Cost of travelling `distance_km` without any surcharge
    pub fn cost(&self, distance_km: f64, profile: &PricingProfile) -> Money {
        self.breakdown(distance_km, profile, CostConditions::none())
            .total
    }

    /// Itemised cost, applying active surcharges matching `conditions`
    pub fn breakdown(
        &self,
        distance_km: f64,
        profile: &PricingProfile,
        conditions: CostConditions,
    ) -> CostBreakdown {
        let profile = match profile.validate() {
            Ok(()) => profile,
            Err(e) => {
                warn!(error = %e, "Invalid pricing profile, using fallback flat rate");
                &self.fallback
            }
        };

        let km = whole_km(distance_km);
        let free = profile.free_km_allowance.unwrap_or(0).max(0) as u64;
        let billable_km = km.saturating_sub(free);

        let base_micros = profile.base_cost_micros.unwrap_or(0);
        let distance_micros = if profile.tiered_ranges.is_empty() {
            profile.flat_rate_per_km_micros.unwrap_or(0) * billable_km as i64
        } else {
            tiered_micros(profile, billable_km)
        };

        let subtotal = base_micros + distance_micros;
        let mut supplement_micros = 0;
        let mut supplements = Vec::new();

        for supplement in profile
            .supplements
            .iter()
            .filter(|s| s.active && conditions.applies(s.kind))
        {
            let amount = subtotal * supplement.percentage / 100 + supplement.fixed_amount_micros;
            supplement_micros += amount;
            supplements.push(AppliedSupplement {
                kind: supplement.kind,
                amount: Money::from_micros(amount),
            });
        }

        CostBreakdown {
            billable_km,
            base: Money::from_micros(base_micros),
            distance: Money::from_micros(distance_micros),
            supplements,
            total: Money::from_micros(subtotal + supplement_micros),
        }
    }
}

/// Partial kilometres are billed as whole ones
fn whole_km(distance_km: f64) -> u64 {
    if distance_km.is_finite() && distance_km > 0.0 {
        distance_km.ceil() as u64
    } else {
        0
    }
}

fn tiered_micros(profile: &PricingProfile, billable_km: u64) -> i64 {
    let mut ranges: Vec<_> = profile.tiered_ranges.iter().collect();
    ranges.sort_by_key(|r| r.from_km);

    let mut remaining = billable_km;
    let mut total = 0i64;

    for range in &ranges {
        if remaining == 0 {
            break;
        }
        let consumed = match range.width() {
            Some(width) => remaining.min(width),
            None => remaining,
        };
        total += consumed as i64 * range.rate_per_km_micros;
        remaining -= consumed;
    }

    // Kilometres beyond a closed last range keep its rate
    if remaining > 0 {
        if let Some(last) = ranges.last() {
            total += remaining as i64 * last.rate_per_km_micros;
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::{Supplement, TieredRange};

    fn tiered_profile() -> PricingProfile {
        PricingProfile::default()
            .with_base_cost(10.0)
            .with_free_km(10)
            .with_range(TieredRange::new(0, Some(20), 0.50))
            .with_range(TieredRange::new(20, None, 0.30))
    }

    #[test]
    fn test_tiered_example() {
        let calculator = TravelCostCalculator::default();

        let cost = calculator.cost(35.0, &tiered_profile());

        assert_eq!(cost, Money::from_cents(2150));
    }

    #[test]
    fn test_partial_km_billed_as_full() {
        let calculator = TravelCostCalculator::default();
        let profile = PricingProfile::flat(micros_from_euros(1.0));

        assert_eq!(calculator.cost(2.1, &profile), Money::from_cents(300));
    }

    #[test]
    fn test_zero_distance_is_base_cost() {
        let calculator = TravelCostCalculator::default();

        assert_eq!(calculator.cost(0.0, &tiered_profile()), Money::from_cents(1000));
    }

    #[test]
    fn test_within_free_allowance() {
        let calculator = TravelCostCalculator::default();

        assert_eq!(calculator.cost(9.2, &tiered_profile()), Money::from_cents(1000));
    }

    #[test]
    fn test_negative_distance_treated_as_zero() {
        let calculator = TravelCostCalculator::default();

        assert_eq!(calculator.cost(-5.0, &tiered_profile()), Money::from_cents(1000));
    }

    #[test]
    fn test_closed_last_range_extends() {
        let calculator = TravelCostCalculator::default();
        let profile = PricingProfile::default()
            .with_range(TieredRange::new(0, Some(10), 1.00))
            .with_range(TieredRange::new(10, Some(20), 0.50));

        // 10 * 1.00 + 10 * 0.50 + 5 * 0.50
        assert_eq!(calculator.cost(25.0, &profile), Money::from_cents(1750));
    }

    #[test]
    fn test_unsorted_ranges_are_sorted() {
        let calculator = TravelCostCalculator::default();
        let profile = PricingProfile::default()
            .with_range(TieredRange::new(10, None, 0.50))
            .with_range(TieredRange::new(0, Some(10), 1.00));

        assert_eq!(calculator.cost(12.0, &profile), Money::from_cents(1100));
    }

    #[test]
    fn test_invalid_profile_uses_fallback() {
        let calculator = TravelCostCalculator::default();

        assert_eq!(
            calculator.cost(10.0, &PricingProfile::default()),
            Money::from_cents(500)
        );

        let negative = PricingProfile::flat(micros_from_euros(2.0)).with_base_cost(-3.0);
        assert_eq!(calculator.cost(10.0, &negative), Money::from_cents(500));
    }

    #[test]
    fn test_cost_is_monotonic_in_distance() {
        let calculator = TravelCostCalculator::default();
        let profiles = [
            tiered_profile(),
            PricingProfile::standard(),
            PricingProfile::flat(micros_from_euros(0.35)).with_free_km(3),
        ];

        for profile in &profiles {
            let mut previous = Money::ZERO;
            for tenth_km in 0..2_000 {
                let cost = calculator.cost(tenth_km as f64 / 10.0, profile);
                assert!(cost >= previous, "cost decreased at {} km", tenth_km as f64 / 10.0);
                previous = cost;
            }
        }
    }

    #[test]
    fn test_breakdown_applies_active_supplements() {
        let calculator = TravelCostCalculator::default();
        let profile = tiered_profile()
            .with_supplement(Supplement {
                kind: SupplementKind::Weekend,
                percentage: 20,
                fixed_amount_micros: 0,
                active: true,
            })
            .with_supplement(Supplement {
                kind: SupplementKind::Urgent,
                percentage: 0,
                fixed_amount_micros: micros_from_euros(20.0),
                active: false,
            });
        let conditions = CostConditions {
            weekend: true,
            urgent: true,
            ..Default::default()
        };

        let breakdown = calculator.breakdown(35.0, &profile, conditions);

        assert_eq!(breakdown.billable_km, 25);
        assert_eq!(breakdown.base, Money::from_cents(1000));
        assert_eq!(breakdown.distance, Money::from_cents(1150));
        assert_eq!(breakdown.supplements.len(), 1);
        assert_eq!(breakdown.supplements[0].amount, Money::from_cents(430));
        assert_eq!(breakdown.total, Money::from_cents(2580));
    }

    #[test]
    fn test_cost_ignores_supplements() {
        let calculator = TravelCostCalculator::default();
        let profile = PricingProfile::standard();

        assert_eq!(
            calculator.cost(12.0, &profile),
            calculator
                .breakdown(12.0, &profile, CostConditions::none())
                .total
        );
    }
}
