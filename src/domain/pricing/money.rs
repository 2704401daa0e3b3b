//! Money amounts

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Micro-units per euro
pub const MICROS_PER_EURO: i64 = 1_000_000;

const MICROS_PER_CENT: i64 = 10_000;

/// Converts a euro amount into micro-euros
pub fn micros_from_euros(euros: f64) -> i64 {
    (euros * MICROS_PER_EURO as f64).round() as i64
}

/// Amount in euro cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Rounds a micro-euro amount to cents, half away from zero
    pub fn from_micros(micros: i64) -> Self {
        let half = MICROS_PER_CENT / 2;
        let cents = if micros >= 0 {
            (micros + half) / MICROS_PER_CENT
        } else {
            (micros - half) / MICROS_PER_CENT
        };
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn to_euros(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
