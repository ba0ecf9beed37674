// src/import/reconcile.rs
//! Reconcile a parsed workbook against the catalog and the price hierarchy.
//!
//! Rows are matched on natural keys: locality by name, street by
//! (locality, name), segment by (street, from, to), coefficient value by
//! (type, code). Matches are updated in place, everything else is inserted.
//! A failing row is reported in `ImportResult::errors` and the import moves on.
use crate::db::coefficients::{find_type_by_code, upsert_value};
use crate::db::prices::{upsert_locality, upsert_segment, upsert_street, SortPlacement};
use crate::domain::catalog::{NewValue, IMPORTED_SORT_ORDER};
use crate::errors::CatalogError;
use crate::import::parsed::{ParsedCoefficient, ParsedDistrict, ParsedExcel, ParsedSegment};
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Districts,
    Coefficients,
    Done,
}

/// Advisory progress report. Ignoring it changes nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportProgress {
    pub stage: ImportStage,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub districts_created: usize,
    pub districts_updated: usize,
    pub streets_created: usize,
    pub streets_updated: usize,
    pub segments_created: usize,
    pub segments_updated: usize,
    /// Every value written, inserted or updated.
    pub coefficients_updated: usize,
    /// The inserted subset of `coefficients_updated`.
    pub coefficients_created: usize,
}

impl ImportStats {
    fn absorb(&mut self, other: ImportStats) {
        self.districts_created += other.districts_created;
        self.districts_updated += other.districts_updated;
        self.streets_created += other.streets_created;
        self.streets_updated += other.streets_updated;
        self.segments_created += other.segments_created;
        self.segments_updated += other.segments_updated;
        self.coefficients_updated += other.coefficients_updated;
        self.coefficients_created += other.coefficients_created;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportResult {
    /// True only when `errors` is empty.
    pub success: bool,
    pub stats: ImportStats,
    pub errors: Vec<String>,
}

pub type ProgressFn<'a> = &'a mut dyn FnMut(ImportProgress);

/// Import every locality group, then every coefficient axis.
///
/// Parser errors already present in `data.errors` are carried into the
/// result, so a workbook with unreadable rows never reports success.
pub fn import_parsed(
    conn: &Connection,
    data: &ParsedExcel,
    mut on_progress: Option<ProgressFn<'_>>,
) -> ImportResult {
    let mut result = ImportResult {
        errors: data.errors.clone(),
        ..Default::default()
    };
    let mut report = |stage, current, total, message: String| {
        if let Some(cb) = on_progress.as_deref_mut() {
            cb(ImportProgress {
                stage,
                current,
                total,
                message,
            });
        }
    };

    let total = data.districts.len();
    for (i, district) in data.districts.iter().enumerate() {
        report(
            ImportStage::Districts,
            i + 1,
            total,
            format!("Đang xử lý {}...", district.district_name),
        );
        import_district(conn, district, &mut result);
    }

    let axes = data.coefficients.by_axis();
    report(
        ImportStage::Coefficients,
        0,
        axes.len(),
        "Đang cập nhật hệ số...".to_string(),
    );
    for (i, (axis, rows)) in axes.iter().enumerate() {
        report(
            ImportStage::Coefficients,
            i + 1,
            axes.len(),
            format!("Đang cập nhật hệ số {axis}..."),
        );
        import_axis(conn, axis, rows, &mut result);
    }

    report(ImportStage::Done, 1, 1, "Hoàn thành!".to_string());

    result.success = result.errors.is_empty();
    tracing::info!(
        success = result.success,
        errors = result.errors.len(),
        stats = ?result.stats,
        "import finished"
    );
    result
}

/// One locality group runs in its own transaction; its counts are merged
/// only once the commit succeeds.
fn import_district(conn: &Connection, district: &ParsedDistrict, result: &mut ImportResult) {
    let name = district.district_name.trim();
    if name.is_empty() {
        result
            .errors
            .push(format!("Locality without a name ({} segments skipped)", district.segments.len()));
        return;
    }

    let tx = match conn.unchecked_transaction() {
        Ok(tx) => tx,
        Err(e) => {
            tracing::error!(locality = name, error = %e, "could not open import transaction");
            result.errors.push(format!("Could not import locality {name}: {e}"));
            return;
        }
    };

    let mut stats = ImportStats::default();
    let district_id = match upsert_locality(&tx, name, SortPlacement::Fixed(IMPORTED_SORT_ORDER)) {
        Ok(up) => {
            if up.was_created() {
                stats.districts_created += 1;
            } else {
                stats.districts_updated += 1;
            }
            up.id()
        }
        Err(e) => {
            tracing::error!(locality = name, error = %e, "locality upsert failed");
            result.errors.push(format!("Could not create locality {name}: {e}"));
            return;
        }
    };

    for (street_name, segments) in group_by_street(&district.segments) {
        if street_name.is_empty() {
            for seg in segments {
                tracing::warn!(locality = name, segment = %seg.key(), "segment without street");
                result
                    .errors
                    .push(format!("{name}: missing street name for segment {}", seg.key()));
            }
            continue;
        }
        import_street(&tx, name, district_id, street_name, &segments, &mut stats, result);
    }

    match tx.commit() {
        Ok(()) => result.stats.absorb(stats),
        Err(e) => {
            tracing::error!(locality = name, error = %e, "import commit failed");
            result.errors.push(format!("Could not save locality {name}: {e}"));
        }
    }
}

fn import_street(
    conn: &Connection,
    locality: &str,
    district_id: i64,
    street_name: &str,
    segments: &[&ParsedSegment],
    stats: &mut ImportStats,
    result: &mut ImportResult,
) {
    let street_id = match upsert_street(conn, district_id, street_name) {
        Ok(up) => {
            if up.was_created() {
                stats.streets_created += 1;
            } else {
                stats.streets_updated += 1;
            }
            up.id()
        }
        Err(e) => {
            tracing::error!(locality, street = street_name, error = %e, "street upsert failed");
            result
                .errors
                .push(format!("Could not create street {locality} / {street_name}: {e}"));
            return;
        }
    };

    for seg in segments {
        match upsert_segment(
            conn,
            street_id,
            seg.segment_from.trim(),
            seg.segment_to.trim(),
            &seg.prices(),
        ) {
            Ok(up) if up.was_created() => stats.segments_created += 1,
            Ok(_) => stats.segments_updated += 1,
            Err(e) => {
                tracing::warn!(locality, street = street_name, segment = %seg.key(), error = %e, "segment skipped");
                result.errors.push(format!(
                    "Could not save segment {locality} / {street_name} ({}): {e}",
                    seg.key()
                ));
            }
        }
    }
}

/// Street groups in order of first appearance, names trimmed.
fn group_by_street(segments: &[ParsedSegment]) -> Vec<(&str, Vec<&ParsedSegment>)> {
    let mut groups: Vec<(&str, Vec<&ParsedSegment>)> = Vec::new();
    for seg in segments {
        let street = seg.street_name.trim();
        match groups.iter_mut().find(|(name, _)| *name == street) {
            Some((_, rows)) => rows.push(seg),
            None => groups.push((street, vec![seg])),
        }
    }
    groups
}

fn import_axis(conn: &Connection, axis: &str, rows: &[ParsedCoefficient], result: &mut ImportResult) {
    if rows.is_empty() {
        return;
    }

    let type_id = match find_type_by_code(conn, axis) {
        Ok(Some(ty)) => ty.id,
        Ok(None) => {
            tracing::error!(axis, "coefficient type missing, axis skipped");
            result.errors.push(format!("Coefficient type not found: {axis}"));
            return;
        }
        Err(e) => {
            tracing::error!(axis, error = %e, "coefficient type lookup failed");
            result.errors.push(format!("Coefficient type {axis}: {e}"));
            return;
        }
    };

    for row in rows {
        match import_coefficient(conn, type_id, row) {
            Ok(created) => {
                result.stats.coefficients_updated += 1;
                if created {
                    result.stats.coefficients_created += 1;
                }
            }
            Err(e) => {
                tracing::warn!(axis, code = %row.code, error = %e, "coefficient skipped");
                result
                    .errors
                    .push(format!("Could not save coefficient {axis}/{}: {e}", row.code));
            }
        }
    }
}

fn import_coefficient(
    conn: &Connection,
    type_id: i64,
    row: &ParsedCoefficient,
) -> Result<bool, CatalogError> {
    let code = row.code.trim();
    let name = row.name.trim();
    if code.is_empty() || name.is_empty() {
        return Err(CatalogError::Required("code and name"));
    }

    let value = NewValue {
        code: code.to_string(),
        name: name.to_string(),
        coefficient: row.coefficient,
        range: row.range(),
        description: row.description.clone().filter(|d| !d.trim().is_empty()),
    };
    Ok(upsert_value(conn, type_id, &value, IMPORTED_SORT_ORDER)?.was_created())
}
