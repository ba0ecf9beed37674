// src/domain/valuation.rs

//! Price valuation: a segment's regulated price band adjusted by one
//! multiplier per coefficient axis.
//!
//! price per m² = base price × land type × location × area × depth × feng shui
//!
//! Everything here is pure. Rounding to whole đồng happens only on the
//! six output prices, never on intermediates.

use crate::domain::prices::Segment;
use serde::{Deserialize, Serialize};

/// One multiplier per canonical axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Multipliers {
    pub land_type: f64,
    pub location: f64,
    pub area: f64,
    pub depth: f64,
    pub feng_shui: f64,
}

impl Multipliers {
    #[cfg(test)]
    pub const IDENTITY: Multipliers = Multipliers {
        land_type: 1.0,
        location: 1.0,
        area: 1.0,
        depth: 1.0,
        feng_shui: 1.0,
    };

    /// Product in fixed axis order so repeated runs round identically.
    pub fn total(&self) -> f64 {
        self.land_type * self.location * self.area * self.depth * self.feng_shui
    }
}

/// The price band the engine reads from a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub base_price_min: f64,
    pub base_price_max: f64,
    pub government_price: f64,
}

impl From<&Segment> for PriceBand {
    fn from(s: &Segment) -> Self {
        Self {
            base_price_min: s.base_price_min,
            base_price_max: s.base_price_max,
            government_price: s.government_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationInput {
    pub band: PriceBand,
    /// Square metres. Callers ensure it is positive; nothing is clamped here.
    pub area: f64,
    pub coefficients: Multipliers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub min: i64,
    pub max: i64,
    pub avg: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoefficients {
    #[serde(flatten)]
    pub multipliers: Multipliers,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub base_price: f64,
    pub base_price_min: f64,
    pub base_price_max: f64,
    pub government_price: f64,
    pub coefficients: AppliedCoefficients,
    pub price_per_m2: Tier,
    pub total_price: Tier,
}

pub fn valuate(input: &ValuationInput) -> Valuation {
    let band = input.band;
    let total = input.coefficients.total();

    let per_m2_min = band.base_price_min * total;
    let per_m2_max = band.base_price_max * total;
    let per_m2_avg = (per_m2_min + per_m2_max) / 2.0;

    Valuation {
        base_price: (band.base_price_min + band.base_price_max) / 2.0,
        base_price_min: band.base_price_min,
        base_price_max: band.base_price_max,
        government_price: band.government_price,
        coefficients: AppliedCoefficients {
            multipliers: input.coefficients,
            total,
        },
        price_per_m2: Tier {
            min: round_vnd(per_m2_min),
            max: round_vnd(per_m2_max),
            avg: round_vnd(per_m2_avg),
        },
        total_price: Tier {
            min: round_vnd(per_m2_min * input.area),
            max: round_vnd(per_m2_max * input.area),
            avg: round_vnd(per_m2_avg * input.area),
        },
    }
}

fn round_vnd(amount: f64) -> i64 {
    amount.round() as i64
}
