// src/domain/catalog.rs

use crate::errors::CatalogError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

// Canonical axis codes. Types are runtime keys into the catalog, so admins may
// add more without a schema change; these five are the ones valuation needs.
pub const LAND_TYPE: &str = "land_type";
pub const LOCATION: &str = "location";
pub const AREA: &str = "area";
pub const DEPTH: &str = "depth";
pub const FENG_SHUI: &str = "feng_shui";

pub const COEFFICIENT_MIN: f64 = 0.0;
pub const COEFFICIENT_MAX: f64 = 10.0;

/// Sort order given to rows created by bulk import so they land after
/// anything an admin placed by hand.
pub const IMPORTED_SORT_ORDER: i64 = 999;

/// A named axis of price adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientType {
    pub id: i64,
    /// Immutable once created.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub has_description: bool,
    pub has_range: bool,
    pub range_field_name: Option<String>,
    pub range_unit: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CoefficientType {
    pub fn summary(&self) -> TypeSummary {
        TypeSummary {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            has_range: self.has_range,
            range_field_name: self.range_field_name.clone(),
            range_unit: self.range_unit.clone(),
            has_description: self.has_description,
        }
    }
}

/// Read-only view of the owning type attached to each listed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub has_range: bool,
    pub range_field_name: Option<String>,
    pub range_unit: Option<String>,
    pub has_description: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientValue {
    pub id: i64,
    pub type_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub coefficient: f64,
    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
    pub sort_order: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A value joined with a summary of its type, as the admin list shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueWithType {
    #[serde(flatten)]
    pub value: CoefficientValue,
    #[serde(rename = "type")]
    pub type_summary: TypeSummary,
}

/// An active type with its values, as the lookup screen renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeWithValues {
    #[serde(flatten)]
    pub coefficient_type: CoefficientType,
    pub values: Vec<CoefficientValue>,
}

/// Options for `create_type`. Unset flags take the catalog defaults:
/// descriptions on, ranges off, active.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTypeOptions {
    pub description: Option<String>,
    pub has_description: Option<bool>,
    pub has_range: Option<bool>,
    pub range_field_name: Option<String>,
    pub range_unit: Option<String>,
    pub is_active: Option<bool>,
}

/// A present field always yields `Some`, so an explicit `null` becomes
/// `Some(None)` (clear) while an absent one stays `None` (keep).
fn nullable<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Partial update of a type. Codes are immutable, so there is no `code` field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub has_description: Option<bool>,
    pub has_range: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub range_field_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub range_unit: Option<Option<String>>,
    pub sort_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl TypeUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.has_description.is_none()
            && self.has_range.is_none()
            && self.range_field_name.is_none()
            && self.range_unit.is_none()
            && self.sort_order.is_none()
            && self.is_active.is_none()
    }
}

/// Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewValue {
    pub code: String,
    pub name: String,
    pub coefficient: f64,
    pub range: Option<ValueRange>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub coefficient: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub range_min: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub range_max: Option<Option<f64>>,
    pub sort_order: Option<i64>,
}

impl ValueUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.coefficient.is_none()
            && self.range_min.is_none()
            && self.range_max.is_none()
            && self.sort_order.is_none()
    }
}

/// Identifies a type either by surrogate id or by its code.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Id(i64),
    Code(String),
}

impl TypeRef {
    /// Numeric strings are ids, anything else is a code.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(id) => TypeRef::Id(id),
            Err(_) => TypeRef::Code(raw.trim().to_string()),
        }
    }
}

/// The bound applies on every write path: admin create/update and import.
pub fn validate_coefficient(coefficient: f64) -> Result<(), CatalogError> {
    if !coefficient.is_finite() || !(COEFFICIENT_MIN..=COEFFICIENT_MAX).contains(&coefficient) {
        return Err(CatalogError::InvalidCoefficient(coefficient));
    }
    Ok(())
}

/// Only checked when both ends are present.
pub fn validate_range(min: Option<f64>, max: Option<f64>) -> Result<(), CatalogError> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(CatalogError::InvalidRange { min, max });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_bounds_are_inclusive() {
        assert!(validate_coefficient(0.0).is_ok());
        assert!(validate_coefficient(10.0).is_ok());
        assert_eq!(
            validate_coefficient(10.01),
            Err(CatalogError::InvalidCoefficient(10.01))
        );
        assert!(validate_coefficient(-0.1).is_err());
        assert!(validate_coefficient(f64::NAN).is_err());
    }

    #[test]
    fn range_requires_min_not_above_max() {
        assert!(validate_range(Some(1.0), Some(1.0)).is_ok());
        assert!(validate_range(None, Some(1.0)).is_ok());
        assert_eq!(
            validate_range(Some(5.0), Some(4.0)),
            Err(CatalogError::InvalidRange { min: 5.0, max: 4.0 })
        );
    }

    #[test]
    fn explicit_null_clears_while_absent_keeps() {
        let update: ValueUpdate =
            serde_json::from_str(r#"{"range_max": null, "description": null}"#).unwrap();
        assert_eq!(update.range_max, Some(None));
        assert_eq!(update.description, Some(None));
        assert_eq!(update.range_min, None);
        assert!(!update.is_empty());

        let update: ValueUpdate = serde_json::from_str(r#"{"range_min": 2.5}"#).unwrap();
        assert_eq!(update.range_min, Some(Some(2.5)));

        let update: TypeUpdate =
            serde_json::from_str(r#"{"range_unit": null, "range_field_name": "width"}"#).unwrap();
        assert_eq!(update.range_unit, Some(None));
        assert_eq!(update.range_field_name, Some(Some("width".into())));
        assert_eq!(update.description, None);
    }

    #[test]
    fn type_ref_parses_ids_and_codes() {
        assert_eq!(TypeRef::parse("12"), TypeRef::Id(12));
        assert_eq!(TypeRef::parse(" depth "), TypeRef::Code("depth".into()));
    }
}
