//! Travel pricing domain

mod calculator;
mod money;
mod profile;

pub use calculator::{
    AppliedSupplement, CostBreakdown, TravelCostCalculator, DEFAULT_FALLBACK_RATE_PER_KM,
};
pub use money::{micros_from_euros, Money, MICROS_PER_EURO};
pub use profile::{CostConditions, PricingProfile, Supplement, SupplementKind, TieredRange};
