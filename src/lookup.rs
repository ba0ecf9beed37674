// src/lookup.rs
//! Valuation addressed by catalog codes: resolve a segment and one value code
//! per axis, price it, and log the lookup.
use crate::db::coefficients::{find_type_by_code, find_value_by_code};
use crate::db::history::{record_search, NewSearch};
use crate::db::prices::get_segment_with_path;
use crate::domain::catalog::{AREA, DEPTH, FENG_SHUI, LAND_TYPE, LOCATION};
use crate::domain::format::{format_price, format_price_per_m2};
use crate::domain::prices::SegmentWithPath;
use crate::domain::valuation::{valuate, Multipliers, PriceBand, Valuation, ValuationInput};
use crate::errors::ServerError;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// One optional value code per canonical axis. An axis left out is priced
/// at 1, i.e. no adjustment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AxisCodes {
    pub land_type: Option<String>,
    pub location: Option<String>,
    pub area: Option<String>,
    pub depth: Option<String>,
    pub feng_shui: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub segment_id: i64,
    pub area: f64,
    #[serde(default)]
    pub codes: AxisCodes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub segment: SegmentWithPath,
    pub area: f64,
    pub codes: AxisCodes,
    pub valuation: Valuation,
    pub display: DisplayPrices,
}

/// Average prices, formatted for the result line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPrices {
    pub price_per_m2: String,
    pub total_price: String,
}

pub fn lookup(conn: &Connection, req: &LookupRequest) -> Result<LookupResult, ServerError> {
    if !req.area.is_finite() || req.area <= 0.0 {
        return Err(ServerError::BadRequest(
            "area must be a positive number".to_string(),
        ));
    }

    let segment = get_segment_with_path(conn, req.segment_id)?;
    let codes = &req.codes;
    let multipliers = Multipliers {
        land_type: multiplier(conn, LAND_TYPE, codes.land_type.as_deref())?,
        location: multiplier(conn, LOCATION, codes.location.as_deref())?,
        area: multiplier(conn, AREA, codes.area.as_deref())?,
        depth: multiplier(conn, DEPTH, codes.depth.as_deref())?,
        feng_shui: multiplier(conn, FENG_SHUI, codes.feng_shui.as_deref())?,
    };

    let valuation = valuate(&ValuationInput {
        band: PriceBand::from(&segment.segment),
        area: req.area,
        coefficients: multipliers,
    });

    let coefficients_json = serde_json::to_string(codes)
        .map_err(|e| ServerError::BadRequest(format!("Invalid codes: {e}")))?;
    record_search(
        conn,
        &NewSearch {
            district_name: &segment.district_name,
            street_name: &segment.street_name,
            segment_desc: &segment.segment.label(),
            area: req.area,
            total_price: valuation.total_price.avg,
            coefficients_json,
        },
    )?;

    tracing::debug!(
        segment_id = req.segment_id,
        area = req.area,
        total = valuation.total_price.avg,
        "valuation recorded"
    );

    Ok(LookupResult {
        segment,
        area: req.area,
        codes: codes.clone(),
        display: DisplayPrices {
            price_per_m2: format_price_per_m2(valuation.price_per_m2.avg as f64),
            total_price: format_price(valuation.total_price.avg as f64),
        },
        valuation,
    })
}

fn multiplier(conn: &Connection, axis: &str, code: Option<&str>) -> Result<f64, ServerError> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(1.0);
    };

    let ty = find_type_by_code(conn, axis)?
        .ok_or_else(|| ServerError::BadRequest(format!("Coefficient type {axis} is not configured")))?;
    let value = find_value_by_code(conn, ty.id, code)?
        .ok_or_else(|| ServerError::BadRequest(format!("Unknown {axis} code: {code}")))?;
    Ok(value.coefficient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::coefficients::create_value;
    use crate::db::connection::test_connection;
    use crate::db::history::recent_searches;
    use crate::db::prices::create_segment;
    use crate::domain::catalog::NewValue;
    use crate::domain::prices::{NewSegment, SegmentPrices};

    fn seed(conn: &Connection) -> i64 {
        let values = [
            (LAND_TYPE, "ODT", 1.2),
            (LOCATION, "VT1", 1.1),
            (AREA, "S1", 0.95),
            (DEPTH, "D1", 1.0),
            (FENG_SHUI, "DN", 1.05),
        ];
        for (axis, code, coefficient) in values {
            let ty = find_type_by_code(conn, axis).unwrap().unwrap();
            create_value(
                conn,
                ty.id,
                &NewValue {
                    code: code.into(),
                    name: code.into(),
                    coefficient,
                    range: None,
                    description: None,
                },
            )
            .unwrap();
        }

        create_segment(
            conn,
            &NewSegment {
                district_name: "Phường 1".into(),
                street_name: "Lê Lợi".into(),
                segment_from: "Đầu đường".into(),
                segment_to: "Cuối đường".into(),
                prices: SegmentPrices {
                    base_price_min: 800_000.0,
                    base_price_max: 1_200_000.0,
                    ..Default::default()
                },
            },
        )
        .unwrap()
        .segment
        .id
    }

    fn all_codes() -> AxisCodes {
        AxisCodes {
            land_type: Some("ODT".into()),
            location: Some("VT1".into()),
            area: Some("S1".into()),
            depth: Some("D1".into()),
            feng_shui: Some("DN".into()),
        }
    }

    #[test]
    fn lookup_prices_by_codes_and_logs_it() {
        let conn = test_connection();
        let segment_id = seed(&conn);

        let result = lookup(
            &conn,
            &LookupRequest { segment_id, area: 150.0, codes: all_codes() },
        )
        .unwrap();

        assert_eq!(result.valuation.price_per_m2.min, 1_053_360);
        assert_eq!(result.valuation.total_price.avg, 197_505_000);
        assert_eq!(result.display.total_price, "197.5 triệu");
        assert_eq!(result.display.price_per_m2, "1.32 triệu/m²");

        let history = recent_searches(&conn, 5).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_price, Some(197_505_000));
        assert_eq!(history[0].segment_desc.as_deref(), Some("Đầu đường - Cuối đường"));
    }

    #[test]
    fn missing_codes_mean_no_adjustment() {
        let conn = test_connection();
        let segment_id = seed(&conn);

        let result = lookup(
            &conn,
            &LookupRequest { segment_id, area: 100.0, codes: AxisCodes::default() },
        )
        .unwrap();
        assert_eq!(result.valuation.coefficients.total, 1.0);
        assert_eq!(result.valuation.price_per_m2.avg, 1_000_000);
    }

    #[test]
    fn rejects_unknown_codes_and_bad_area() {
        let conn = test_connection();
        let segment_id = seed(&conn);

        let mut codes = all_codes();
        codes.depth = Some("NOPE".into());
        let err = lookup(&conn, &LookupRequest { segment_id, area: 100.0, codes }).unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(msg) if msg.contains("NOPE")));

        let err = lookup(
            &conn,
            &LookupRequest { segment_id, area: 0.0, codes: all_codes() },
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));

        let err = lookup(
            &conn,
            &LookupRequest { segment_id: 9999, area: 10.0, codes: all_codes() },
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::NotFound));
        assert!(recent_searches(&conn, 5).unwrap().is_empty());
    }
}
