// src/domain/prices.rs

use crate::domain::catalog::validate_coefficient;
use crate::errors::CatalogError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

const LOCALITY_CODE_MAX_LEN: usize = 10;

/// An administrative district/ward. Stored in the `districts` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Locality {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub sort_order: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Street {
    pub id: i64,
    pub district_id: i64,
    pub code: Option<String>,
    pub name: String,
    pub created_at: NaiveDateTime,
}

/// A priced stretch of a street, labelled "from X to Y".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub id: i64,
    pub street_id: i64,
    pub segment_from: String,
    pub segment_to: String,
    pub base_price_min: f64,
    pub base_price_max: f64,
    /// Regulatory reference price. Informational, not part of valuation.
    pub government_price: f64,
    pub adjustment_coef_min: f64,
    pub adjustment_coef_max: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Segment {
    pub fn label(&self) -> String {
        format!("{} - {}", self.segment_from, self.segment_to)
    }
}

/// Segment with the names of its street and locality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentWithPath {
    #[serde(flatten)]
    pub segment: Segment,
    pub street_name: String,
    pub district_id: i64,
    pub district_name: String,
}

/// The five numeric fields an import or admin edit writes onto a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentPrices {
    pub base_price_min: f64,
    pub base_price_max: f64,
    pub government_price: f64,
    pub adjustment_coef_min: f64,
    pub adjustment_coef_max: f64,
}

impl Default for SegmentPrices {
    fn default() -> Self {
        Self {
            base_price_min: 0.0,
            base_price_max: 0.0,
            government_price: 0.0,
            adjustment_coef_min: 1.0,
            adjustment_coef_max: 1.0,
        }
    }
}

impl SegmentPrices {
    pub fn validate(&self) -> Result<(), CatalogError> {
        SegmentUpdate {
            base_price_min: Some(self.base_price_min),
            base_price_max: Some(self.base_price_max),
            government_price: Some(self.government_price),
            adjustment_coef_min: Some(self.adjustment_coef_min),
            adjustment_coef_max: Some(self.adjustment_coef_max),
        }
        .validate()
    }
}

/// Admin creation of a segment addressed by names; missing locality and
/// street rows are created on the way.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSegment {
    pub district_name: String,
    pub street_name: String,
    pub segment_from: String,
    pub segment_to: String,
    #[serde(flatten)]
    pub prices: SegmentPrices,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentUpdate {
    pub base_price_min: Option<f64>,
    pub base_price_max: Option<f64>,
    pub government_price: Option<f64>,
    pub adjustment_coef_min: Option<f64>,
    pub adjustment_coef_max: Option<f64>,
}

impl SegmentUpdate {
    pub fn is_empty(&self) -> bool {
        self.base_price_min.is_none()
            && self.base_price_max.is_none()
            && self.government_price.is_none()
            && self.adjustment_coef_min.is_none()
            && self.adjustment_coef_max.is_none()
    }

    /// Prices must be non-negative, adjustment coefficients within the
    /// catalog bound, and min <= max when both prices are supplied.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let prices = [
            ("base_price_min", self.base_price_min),
            ("base_price_max", self.base_price_max),
            ("government_price", self.government_price),
        ];
        for (field, value) in prices {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(CatalogError::InvalidPrice(format!(
                        "{field} must be a non-negative number"
                    )));
                }
            }
        }
        for coef in [self.adjustment_coef_min, self.adjustment_coef_max]
            .into_iter()
            .flatten()
        {
            validate_coefficient(coef)?;
        }
        if let (Some(min), Some(max)) = (self.base_price_min, self.base_price_max) {
            if min > max {
                return Err(CatalogError::InvalidPrice(format!(
                    "base_price_min {min} is greater than base_price_max {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Counts returned by a full price-data wipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClearedPrices {
    pub segments: usize,
    pub streets: usize,
    pub districts: usize,
}

/// Short code from word initials: "TP. Trà Vinh" -> "TTV".
pub fn initials_code(name: &str) -> String {
    let code: String = name
        .split_whitespace()
        .filter_map(|w| w.chars().find(|c| c.is_alphanumeric()))
        .flat_map(char::to_uppercase)
        .take(LOCALITY_CODE_MAX_LEN)
        .collect();

    if code.is_empty() {
        "X".to_string()
    } else {
        code
    }
}
