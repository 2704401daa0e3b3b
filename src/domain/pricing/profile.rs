//! Per-professional travel pricing profile

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::money::micros_from_euros;
use crate::domain::DomainError;

/// Per-km price band over billable kilometres
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredRange {
    pub from_km: i64,
    /// `None` for an open-ended range
    pub to_km: Option<i64>,
    /// Price per km in micro-euros
    pub rate_per_km_micros: i64,
}

impl TieredRange {
    pub fn new(from_km: i64, to_km: Option<i64>, rate_per_km: f64) -> Self {
        Self {
            from_km,
            to_km,
            rate_per_km_micros: micros_from_euros(rate_per_km),
        }
    }

    /// Kilometres this range can absorb, `None` when open-ended
    pub fn width(&self) -> Option<u64> {
        self.to_km.map(|to| (to - self.from_km).max(0) as u64)
    }
}

/// Condition that can make a surcharge apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplementKind {
    Weekend,
    Night,
    Holiday,
    Urgent,
}

impl SupplementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekend => "weekend",
            Self::Night => "night",
            Self::Holiday => "holiday",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for SupplementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupplementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekend" => Ok(Self::Weekend),
            "night" => Ok(Self::Night),
            "holiday" => Ok(Self::Holiday),
            "urgent" => Ok(Self::Urgent),
            other => Err(DomainError::validation(format!(
                "Unknown supplement type: {}",
                other
            ))),
        }
    }
}

/// Surcharge applied on top of base and distance cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplement {
    pub kind: SupplementKind,
    /// Percentage of base + distance cost
    pub percentage: i64,
    pub fixed_amount_micros: i64,
    pub active: bool,
}

/// Circumstances of a job, used to select surcharges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostConditions {
    #[serde(default)]
    pub weekend: bool,
    #[serde(default)]
    pub night: bool,
    #[serde(default)]
    pub holiday: bool,
    #[serde(default)]
    pub urgent: bool,
}

impl CostConditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn applies(&self, kind: SupplementKind) -> bool {
        match kind {
            SupplementKind::Weekend => self.weekend,
            SupplementKind::Night => self.night,
            SupplementKind::Holiday => self.holiday,
            SupplementKind::Urgent => self.urgent,
        }
    }
}

/// How a professional charges for travel. Amounts are micro-euros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingProfile {
    #[serde(default)]
    pub base_cost_micros: Option<i64>,
    #[serde(default)]
    pub free_km_allowance: Option<i64>,
    #[serde(default)]
    pub flat_rate_per_km_micros: Option<i64>,
    #[serde(default)]
    pub tiered_ranges: Vec<TieredRange>,
    #[serde(default)]
    pub supplements: Vec<Supplement>,
}

impl PricingProfile {
    /// Flat per-km profile with no base cost or allowance
    pub fn flat(rate_per_km_micros: i64) -> Self {
        Self {
            flat_rate_per_km_micros: Some(rate_per_km_micros),
            ..Default::default()
        }
    }

    /// Profile used for professionals who never configured their own
    pub fn standard() -> Self {
        Self {
            base_cost_micros: Some(micros_from_euros(10.0)),
            free_km_allowance: Some(0),
            flat_rate_per_km_micros: None,
            tiered_ranges: vec![
                TieredRange::new(0, Some(10), 1.00),
                TieredRange::new(10, Some(50), 0.80),
                TieredRange::new(50, None, 0.60),
            ],
            supplements: vec![
                Supplement {
                    kind: SupplementKind::Weekend,
                    percentage: 20,
                    fixed_amount_micros: 0,
                    active: false,
                },
                Supplement {
                    kind: SupplementKind::Night,
                    percentage: 30,
                    fixed_amount_micros: 0,
                    active: false,
                },
                Supplement {
                    kind: SupplementKind::Holiday,
                    percentage: 50,
                    fixed_amount_micros: 0,
                    active: false,
                },
                Supplement {
                    kind: SupplementKind::Urgent,
                    percentage: 0,
                    fixed_amount_micros: micros_from_euros(20.0),
                    active: false,
                },
            ],
        }
    }

    pub fn with_base_cost(mut self, euros: f64) -> Self {
        self.base_cost_micros = Some(micros_from_euros(euros));
        self
    }

    pub fn with_free_km(mut self, km: i64) -> Self {
        self.free_km_allowance = Some(km);
        self
    }

    pub fn with_range(mut self, range: TieredRange) -> Self {
        self.tiered_ranges.push(range);
        self
    }

    pub fn with_supplement(mut self, supplement: Supplement) -> Self {
        self.supplements.push(supplement);
        self
    }

    /// Checks the profile can be billed as configured
    pub fn validate(&self) -> Result<(), DomainError> {
        let negative = |name: &str, value: Option<i64>| match value {
            Some(v) if v < 0 => Err(DomainError::configuration(format!(
                "{} must not be negative, got {}",
                name, v
            ))),
            _ => Ok(()),
        };

        negative("base_cost", self.base_cost_micros)?;
        negative("free_km_allowance", self.free_km_allowance)?;
        negative("flat_rate_per_km", self.flat_rate_per_km_micros)?;

        if self.tiered_ranges.is_empty() && self.flat_rate_per_km_micros.is_none() {
            return Err(DomainError::configuration(
                "Profile has neither tiered ranges nor a flat rate",
            ));
        }

        for range in &self.tiered_ranges {
            if range.from_km < 0 || range.rate_per_km_micros < 0 {
                return Err(DomainError::configuration(format!(
                    "Range starting at {} km has negative values",
                    range.from_km
                )));
            }
            if let Some(to) = range.to_km.filter(|to| *to < range.from_km) {
                return Err(DomainError::configuration(format!(
                    "Range {}-{} km ends before it starts",
                    range.from_km, to
                )));
            }
        }

        for supplement in &self.supplements {
            if supplement.percentage < 0 || supplement.fixed_amount_micros < 0 {
                return Err(DomainError::configuration(format!(
                    "Supplement {} has negative values",
                    supplement.kind
                )));
            }
        }

        Ok(())
    }
}
