// src/import/parsed.rs
//! What the workbook parser hands to the reconciler.
use crate::domain::catalog::{ValueRange, AREA, DEPTH, FENG_SHUI, LAND_TYPE, LOCATION};
use crate::domain::prices::SegmentPrices;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SEGMENT_FROM: &str = "Đầu đường";
pub const DEFAULT_SEGMENT_TO: &str = "Cuối đường";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSegment {
    pub street_name: String,
    pub segment_from: String,
    pub segment_to: String,
    pub base_price_min: f64,
    pub base_price_max: f64,
    pub government_price: f64,
    pub adjustment_coef_min: f64,
    pub adjustment_coef_max: f64,
}

impl ParsedSegment {
    pub fn prices(&self) -> SegmentPrices {
        SegmentPrices {
            base_price_min: self.base_price_min,
            base_price_max: self.base_price_max,
            government_price: self.government_price,
            adjustment_coef_min: self.adjustment_coef_min,
            adjustment_coef_max: self.adjustment_coef_max,
        }
    }

    /// "from-to", used to name the row in error messages.
    pub fn key(&self) -> String {
        format!("{}-{}", self.segment_from, self.segment_to)
    }
}

/// A locality and every segment row found for it, in sheet order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDistrict {
    pub district_name: String,
    pub segments: Vec<ParsedSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCoefficient {
    pub code: String,
    pub name: String,
    pub coefficient: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_max: Option<f64>,
}

impl ParsedCoefficient {
    /// Collapses the width/area/depth columns onto the catalog's single
    /// range. When a row somehow carries several, depth wins over area over
    /// width. A lone bound is kept with the other end open.
    pub fn range(&self) -> Option<ValueRange> {
        [
            (self.depth_min, self.depth_max),
            (self.area_min, self.area_max),
            (self.width_min, self.width_max),
        ]
        .into_iter()
        .find_map(|(min, max)| {
            (min.is_some() || max.is_some()).then_some(ValueRange { min, max })
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCoefficients {
    pub land_types: Vec<ParsedCoefficient>,
    pub locations: Vec<ParsedCoefficient>,
    pub areas: Vec<ParsedCoefficient>,
    pub depths: Vec<ParsedCoefficient>,
    pub feng_shuis: Vec<ParsedCoefficient>,
}

impl ParsedCoefficients {
    /// Rows per canonical axis code, in import order.
    pub fn by_axis(&self) -> [(&'static str, &[ParsedCoefficient]); 5] {
        [
            (LAND_TYPE, self.land_types.as_slice()),
            (LOCATION, self.locations.as_slice()),
            (AREA, self.areas.as_slice()),
            (DEPTH, self.depths.as_slice()),
            (FENG_SHUI, self.feng_shuis.as_slice()),
        ]
    }

    pub fn len(&self) -> usize {
        self.by_axis().iter().map(|(_, rows)| rows.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedExcel {
    pub districts: Vec<ParsedDistrict>,
    pub coefficients: ParsedCoefficients,
    /// Problems the parser already found; carried into the import result.
    pub errors: Vec<String>,
}

impl ParsedExcel {
    /// Append segments to the locality's group, creating it on first sight.
    pub fn push_segments(&mut self, district_name: &str, segments: Vec<ParsedSegment>) {
        match self
            .districts
            .iter_mut()
            .find(|d| d.district_name == district_name)
        {
            Some(existing) => existing.segments.extend(segments),
            None => self.districts.push(ParsedDistrict {
                district_name: district_name.to_string(),
                segments,
            }),
        }
    }
}
