// src/db/coefficients.rs
//! Coefficient catalog persistence: types and the coded values under them.
use crate::db::{execute_update, is_unique_violation, Upserted};
use crate::domain::catalog::{
    validate_coefficient, validate_range, CoefficientType, CoefficientValue, NewTypeOptions,
    NewValue, TypeRef, TypeUpdate, TypeWithValues, ValueUpdate, ValueWithType,
};
use crate::errors::CatalogError;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TYPE_COLUMNS: &str = "id, code, name, description, has_description, has_range, \
     range_field_name, range_unit, sort_order, is_active, created_at, updated_at";

const VALUE_COLUMNS: &str = "id, type_id, code, name, description, coefficient, \
     range_min, range_max, sort_order, created_at, updated_at";

fn type_from_row(r: &Row) -> rusqlite::Result<CoefficientType> {
    Ok(CoefficientType {
        id: r.get(0)?,
        code: r.get(1)?,
        name: r.get(2)?,
        description: r.get(3)?,
        has_description: r.get(4)?,
        has_range: r.get(5)?,
        range_field_name: r.get(6)?,
        range_unit: r.get(7)?,
        sort_order: r.get(8)?,
        is_active: r.get(9)?,
        created_at: r.get(10)?,
        updated_at: r.get(11)?,
    })
}

fn value_from_row(r: &Row) -> rusqlite::Result<CoefficientValue> {
    Ok(CoefficientValue {
        id: r.get(0)?,
        type_id: r.get(1)?,
        code: r.get(2)?,
        name: r.get(3)?,
        description: r.get(4)?,
        coefficient: r.get(5)?,
        range_min: r.get(6)?,
        range_max: r.get(7)?,
        sort_order: r.get(8)?,
        created_at: r.get(9)?,
        updated_at: r.get(10)?,
    })
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Create a type at the end of the current ordering.
/// Fails with `DuplicateCode` if the code is taken.
pub fn create_type(
    conn: &Connection,
    code: &str,
    name: &str,
    opts: &NewTypeOptions,
) -> Result<CoefficientType, CatalogError> {
    let code = code.trim();
    let name = name.trim();
    if code.is_empty() || name.is_empty() {
        return Err(CatalogError::Required("code and name"));
    }
    let now = Utc::now().naive_utc();

    // sort order is computed inside the insert so two creates cannot share it
    let inserted = conn.execute(
        r#"
        insert into coefficient_types (
            code, name, description, has_description, has_range,
            range_field_name, range_unit, sort_order, is_active, created_at, updated_at
        )
        select ?1, ?2, ?3, ?4, ?5, ?6, ?7, coalesce(max(sort_order), 0) + 1, ?8, ?9, ?9
        from coefficient_types
        "#,
        params![
            code,
            name,
            opts.description,
            opts.has_description.unwrap_or(true),
            opts.has_range.unwrap_or(false),
            opts.range_field_name,
            opts.range_unit,
            opts.is_active.unwrap_or(true),
            now,
        ],
    );

    match inserted {
        Ok(_) => get_type(conn, conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(CatalogError::DuplicateCode {
            code: code.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

pub fn get_type(conn: &Connection, id: i64) -> Result<CoefficientType, CatalogError> {
    conn.query_row(
        &format!("select {TYPE_COLUMNS} from coefficient_types where id = ?"),
        params![id],
        type_from_row,
    )
    .optional()?
    .ok_or_else(|| CatalogError::not_found("coefficient type", id))
}

pub fn find_type_by_code(
    conn: &Connection,
    code: &str,
) -> Result<Option<CoefficientType>, CatalogError> {
    Ok(conn
        .query_row(
            &format!("select {TYPE_COLUMNS} from coefficient_types where code = ?"),
            params![code],
            type_from_row,
        )
        .optional()?)
}

pub fn resolve_type(conn: &Connection, type_ref: &TypeRef) -> Result<CoefficientType, CatalogError> {
    match type_ref {
        TypeRef::Id(id) => get_type(conn, *id),
        TypeRef::Code(code) => find_type_by_code(conn, code)?
            .ok_or_else(|| CatalogError::not_found("coefficient type", code)),
    }
}

pub fn list_types(conn: &Connection) -> Result<Vec<CoefficientType>, CatalogError> {
    let mut stmt = conn.prepare(&format!(
        "select {TYPE_COLUMNS} from coefficient_types order by sort_order asc, id asc"
    ))?;
    let rows = stmt.query_map([], type_from_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Partial update. Only supplied fields change; the code never does.
pub fn update_type(
    conn: &Connection,
    id: i64,
    update: &TypeUpdate,
) -> Result<CoefficientType, CatalogError> {
    if update.is_empty() {
        return Err(CatalogError::EmptyUpdate);
    }

    let mut sets: Vec<(&str, Value)> = Vec::new();
    if let Some(v) = &update.name {
        sets.push(("name", v.clone().into()));
    }
    if let Some(v) = &update.description {
        sets.push(("description", v.clone().into()));
    }
    if let Some(v) = update.has_description {
        sets.push(("has_description", v.into()));
    }
    if let Some(v) = update.has_range {
        sets.push(("has_range", v.into()));
    }
    if let Some(v) = &update.range_field_name {
        sets.push(("range_field_name", v.clone().into()));
    }
    if let Some(v) = &update.range_unit {
        sets.push(("range_unit", v.clone().into()));
    }
    if let Some(v) = update.sort_order {
        sets.push(("sort_order", v.into()));
    }
    if let Some(v) = update.is_active {
        sets.push(("is_active", v.into()));
    }

    let changed = execute_update(conn, "coefficient_types", id, sets)?;
    if changed == 0 {
        return Err(CatalogError::not_found("coefficient type", id));
    }
    get_type(conn, id)
}

/// Delete a type and, through the foreign key, all of its values.
/// Returns how many values went with it.
pub fn delete_type(conn: &Connection, id: i64) -> Result<usize, CatalogError> {
    let tx = conn.unchecked_transaction()?;

    let values: i64 = tx.query_row(
        "select count(*) from coefficient_values where type_id = ?",
        params![id],
        |r| r.get(0),
    )?;
    let deleted = tx.execute("delete from coefficient_types where id = ?", params![id])?;
    if deleted == 0 {
        return Err(CatalogError::not_found("coefficient type", id));
    }

    tx.commit()?;
    tracing::info!(type_id = id, values, "deleted coefficient type");
    Ok(values as usize)
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Create a value at the end of its type's ordering.
pub fn create_value(
    conn: &Connection,
    type_id: i64,
    value: &NewValue,
) -> Result<CoefficientValue, CatalogError> {
    get_type(conn, type_id)?;
    validate_coefficient(value.coefficient)?;
    let (range_min, range_max) = split_range(value);
    validate_range(range_min, range_max)?;

    let now = Utc::now().naive_utc();
    let inserted = conn.execute(
        r#"
        insert into coefficient_values (
            type_id, code, name, description, coefficient,
            range_min, range_max, sort_order, created_at, updated_at
        )
        select ?1, ?2, ?3, ?4, ?5, ?6, ?7, coalesce(max(sort_order), 0) + 1, ?8, ?8
        from coefficient_values where type_id = ?1
        "#,
        params![
            type_id,
            value.code.trim(),
            value.name.trim(),
            value.description,
            value.coefficient,
            range_min,
            range_max,
            now,
        ],
    );

    match inserted {
        Ok(_) => get_value(conn, conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(CatalogError::DuplicateCode {
            code: value.code.trim().to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

pub fn get_value(conn: &Connection, id: i64) -> Result<CoefficientValue, CatalogError> {
    conn.query_row(
        &format!("select {VALUE_COLUMNS} from coefficient_values where id = ?"),
        params![id],
        value_from_row,
    )
    .optional()?
    .ok_or_else(|| CatalogError::not_found("coefficient value", id))
}

pub fn find_value_by_code(
    conn: &Connection,
    type_id: i64,
    code: &str,
) -> Result<Option<CoefficientValue>, CatalogError> {
    Ok(conn
        .query_row(
            &format!("select {VALUE_COLUMNS} from coefficient_values where type_id = ? and code = ?"),
            params![type_id, code],
            value_from_row,
        )
        .optional()?)
}

/// Values of one type by sort order, each carrying a summary of the type.
pub fn list_values_by_type(
    conn: &Connection,
    type_ref: &TypeRef,
) -> Result<Vec<ValueWithType>, CatalogError> {
    let ty = resolve_type(conn, type_ref)?;
    let summary = ty.summary();

    let mut stmt = conn.prepare(&format!(
        "select {VALUE_COLUMNS} from coefficient_values where type_id = ? order by sort_order asc, id asc"
    ))?;
    let rows = stmt.query_map(params![ty.id], value_from_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(ValueWithType {
            value: r?,
            type_summary: summary.clone(),
        });
    }
    Ok(out)
}

/// Every active type in order, each with its values in order.
pub fn list_active_catalog(conn: &Connection) -> Result<Vec<TypeWithValues>, CatalogError> {
    let mut values_stmt = conn.prepare(&format!(
        "select {VALUE_COLUMNS} from coefficient_values where type_id = ? order by sort_order asc, id asc"
    ))?;

    let mut out = Vec::new();
    for ty in list_types(conn)?.into_iter().filter(|t| t.is_active) {
        let rows = values_stmt.query_map(params![ty.id], value_from_row)?;
        let mut values = Vec::new();
        for r in rows {
            values.push(r?);
        }
        out.push(TypeWithValues {
            coefficient_type: ty,
            values,
        });
    }
    Ok(out)
}

/// Partial update; the merged coefficient and range are re-validated.
pub fn update_value(
    conn: &Connection,
    id: i64,
    update: &ValueUpdate,
) -> Result<CoefficientValue, CatalogError> {
    if update.is_empty() {
        return Err(CatalogError::EmptyUpdate);
    }
    let current = get_value(conn, id)?;

    if let Some(c) = update.coefficient {
        validate_coefficient(c)?;
    }
    let range_min = update.range_min.unwrap_or(current.range_min);
    let range_max = update.range_max.unwrap_or(current.range_max);
    validate_range(range_min, range_max)?;

    let mut sets: Vec<(&str, Value)> = Vec::new();
    if let Some(v) = &update.name {
        sets.push(("name", v.clone().into()));
    }
    if let Some(v) = &update.description {
        sets.push(("description", v.clone().into()));
    }
    if let Some(v) = update.coefficient {
        sets.push(("coefficient", v.into()));
    }
    if let Some(v) = update.range_min {
        sets.push(("range_min", v.into()));
    }
    if let Some(v) = update.range_max {
        sets.push(("range_max", v.into()));
    }
    if let Some(v) = update.sort_order {
        sets.push(("sort_order", v.into()));
    }

    execute_update(conn, "coefficient_values", id, sets)?;
    get_value(conn, id)
}

pub fn delete_value(conn: &Connection, id: i64) -> Result<(), CatalogError> {
    let deleted = conn.execute("delete from coefficient_values where id = ?", params![id])?;
    if deleted == 0 {
        return Err(CatalogError::not_found("coefficient value", id));
    }
    Ok(())
}

/// Empty one type's catalog, keeping the type itself.
pub fn delete_all_values(conn: &Connection, type_id: i64) -> Result<usize, CatalogError> {
    get_type(conn, type_id)?;
    let deleted = conn.execute(
        "delete from coefficient_values where type_id = ?",
        params![type_id],
    )?;
    tracing::info!(type_id, deleted, "cleared coefficient values");
    Ok(deleted)
}

/// Insert-or-update keyed on (type_id, code), as bulk import needs it.
/// Imported rows that are new go to the end of the ordering.
pub fn upsert_value(
    conn: &Connection,
    type_id: i64,
    value: &NewValue,
    sort_order: i64,
) -> Result<Upserted, CatalogError> {
    validate_coefficient(value.coefficient)?;
    let (range_min, range_max) = split_range(value);
    validate_range(range_min, range_max)?;
    let now = Utc::now().naive_utc();

    let inserted = conn.execute(
        r#"
        insert into coefficient_values (
            type_id, code, name, description, coefficient,
            range_min, range_max, sort_order, created_at, updated_at
        ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        on conflict(type_id, code) do nothing
        "#,
        params![
            type_id,
            value.code,
            value.name,
            value.description,
            value.coefficient,
            range_min,
            range_max,
            sort_order,
            now,
        ],
    )?;
    if inserted == 1 {
        return Ok(Upserted::Created(conn.last_insert_rowid()));
    }

    let id: i64 = conn.query_row(
        r#"
        update coefficient_values set
            name = ?3, description = ?4, coefficient = ?5,
            range_min = ?6, range_max = ?7, updated_at = ?8
        where type_id = ?1 and code = ?2
        returning id
        "#,
        params![
            type_id,
            value.code,
            value.name,
            value.description,
            value.coefficient,
            range_min,
            range_max,
            now,
        ],
        |r| r.get(0),
    )?;
    Ok(Upserted::Existing(id))
}

fn split_range(value: &NewValue) -> (Option<f64>, Option<f64>) {
    let range = value.range.unwrap_or_default();
    (range.min, range.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;
    use crate::domain::catalog::{ValueRange, DEPTH, LAND_TYPE};

    fn value(code: &str, coefficient: f64) -> NewValue {
        NewValue {
            code: code.into(),
            name: format!("Value {code}"),
            coefficient,
            range: None,
            description: None,
        }
    }

    fn type_id(conn: &Connection, code: &str) -> i64 {
        find_type_by_code(conn, code).unwrap().unwrap().id
    }

    #[test]
    fn create_type_appends_and_applies_defaults() {
        let conn = test_connection();
        let ty = create_type(&conn, "frontage", "Mặt tiền", &NewTypeOptions::default()).unwrap();

        assert_eq!(ty.sort_order, 6); // five seeded types come first
        assert!(ty.has_description);
        assert!(!ty.has_range);
        assert!(ty.is_active);
    }

    #[test]
    fn create_type_rejects_duplicate_code() {
        let conn = test_connection();
        let err = create_type(&conn, LAND_TYPE, "again", &NewTypeOptions::default()).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateCode { code: LAND_TYPE.into() });
        assert_eq!(list_types(&conn).unwrap().len(), 5);
    }

    #[test]
    fn active_catalog_skips_inactive_types() {
        let conn = test_connection();
        let land = type_id(&conn, LAND_TYPE);
        create_value(&conn, land, &value("ODT", 1.2)).unwrap();
        update_type(
            &conn,
            type_id(&conn, DEPTH),
            &TypeUpdate { is_active: Some(false), ..Default::default() },
        )
        .unwrap();

        let catalog = list_active_catalog(&conn).unwrap();
        let codes: Vec<_> = catalog.iter().map(|t| t.coefficient_type.code.as_str()).collect();
        assert_eq!(codes, ["land_type", "location", "area", "feng_shui"]);
        assert_eq!(catalog[0].values.len(), 1);
    }

    #[test]
    fn duplicate_value_code_leaves_catalog_unchanged() {
        let conn = test_connection();
        let land = type_id(&conn, LAND_TYPE);
        create_value(&conn, land, &value("ODT", 1.2)).unwrap();

        let err = create_value(&conn, land, &value("ODT", 1.5)).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateCode { code: "ODT".into() });

        let values = list_values_by_type(&conn, &TypeRef::Id(land)).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value.coefficient, 1.2);
    }

    #[test]
    fn same_value_code_is_allowed_in_different_types() {
        let conn = test_connection();
        create_value(&conn, type_id(&conn, LAND_TYPE), &value("A", 1.0)).unwrap();
        create_value(&conn, type_id(&conn, DEPTH), &value("A", 1.0)).unwrap();
    }

    #[test]
    fn create_value_enforces_bounds_and_range() {
        let conn = test_connection();
        let depth = type_id(&conn, DEPTH);

        assert_eq!(
            create_value(&conn, depth, &value("X", 10.5)).unwrap_err(),
            CatalogError::InvalidCoefficient(10.5)
        );

        let mut inverted = value("Y", 1.0);
        inverted.range = Some(ValueRange { min: Some(20.0), max: Some(10.0) });
        assert!(matches!(
            create_value(&conn, depth, &inverted),
            Err(CatalogError::InvalidRange { .. })
        ));

        assert!(matches!(
            create_value(&conn, 9999, &value("Z", 1.0)),
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[test]
    fn values_list_in_sort_order_with_type_summary() {
        let conn = test_connection();
        let depth = type_id(&conn, DEPTH);
        let a = create_value(&conn, depth, &value("D1", 1.0)).unwrap();
        let b = create_value(&conn, depth, &value("D2", 0.9)).unwrap();
        assert_eq!((a.sort_order, b.sort_order), (1, 2));

        update_value(
            &conn,
            a.id,
            &ValueUpdate { sort_order: Some(5), ..Default::default() },
        )
        .unwrap();

        let listed = list_values_by_type(&conn, &TypeRef::Code(DEPTH.into())).unwrap();
        let codes: Vec<_> = listed.iter().map(|v| v.value.code.as_str()).collect();
        assert_eq!(codes, ["D2", "D1"]);
        assert_eq!(listed[0].type_summary.code, DEPTH);
        assert!(listed[0].type_summary.has_range);
        assert_eq!(listed[0].type_summary.range_unit.as_deref(), Some("m"));
    }

    #[test]
    fn update_value_validates_merged_range() {
        let conn = test_connection();
        let depth = type_id(&conn, DEPTH);
        let mut v = value("D1", 1.0);
        v.range = Some(ValueRange { min: Some(0.0), max: Some(15.0) });
        let created = create_value(&conn, depth, &v).unwrap();

        let err = update_value(
            &conn,
            created.id,
            &ValueUpdate { range_min: Some(Some(20.0)), ..Default::default() },
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRange { .. }));

        let updated = update_value(
            &conn,
            created.id,
            &ValueUpdate { coefficient: Some(0.8), ..Default::default() },
        )
        .unwrap();
        assert_eq!(updated.coefficient, 0.8);
        assert_eq!(updated.range_max, Some(15.0));
        assert_eq!(updated.name, "Value D1");
    }

    #[test]
    fn updates_on_missing_ids_are_not_found() {
        let conn = test_connection();
        let update = ValueUpdate { name: Some("x".into()), ..Default::default() };
        assert!(matches!(update_value(&conn, 42, &update), Err(CatalogError::NotFound { .. })));

        let type_update = TypeUpdate { name: Some("x".into()), ..Default::default() };
        assert!(matches!(update_type(&conn, 42, &type_update), Err(CatalogError::NotFound { .. })));
        assert_eq!(update_type(&conn, 1, &TypeUpdate::default()), Err(CatalogError::EmptyUpdate));
    }

    #[test]
    fn update_type_changes_only_supplied_fields() {
        let conn = test_connection();
        let id = type_id(&conn, LAND_TYPE);
        let updated = update_type(
            &conn,
            id,
            &TypeUpdate {
                has_range: Some(true),
                range_unit: Some(Some("m".into())),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.code, LAND_TYPE);
        assert_eq!(updated.name, "Loại đất");
        assert!(updated.has_range);
        assert_eq!(updated.range_unit.as_deref(), Some("m"));
    }

    #[test]
    fn delete_type_cascades_and_reports_count() {
        let conn = test_connection();
        let land = type_id(&conn, LAND_TYPE);
        create_value(&conn, land, &value("A", 1.0)).unwrap();
        create_value(&conn, land, &value("B", 1.1)).unwrap();

        assert_eq!(delete_type(&conn, land).unwrap(), 2);
        let orphans: i64 = conn
            .query_row("select count(*) from coefficient_values where type_id = ?", [land], |r| r.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(delete_type(&conn, land), Err(CatalogError::NotFound { .. })));
    }

    #[test]
    fn delete_all_values_keeps_the_type() {
        let conn = test_connection();
        let depth = type_id(&conn, DEPTH);
        create_value(&conn, depth, &value("A", 1.0)).unwrap();
        create_value(&conn, depth, &value("B", 1.0)).unwrap();

        assert_eq!(delete_all_values(&conn, depth).unwrap(), 2);
        assert!(get_type(&conn, depth).is_ok());
        assert!(list_values_by_type(&conn, &TypeRef::Id(depth)).unwrap().is_empty());
    }

    #[test]
    fn upsert_value_inserts_then_updates_in_place() {
        let conn = test_connection();
        let land = type_id(&conn, LAND_TYPE);

        let first = upsert_value(&conn, land, &value("ODT", 1.2), 999).unwrap();
        assert!(first.was_created());

        let second = upsert_value(&conn, land, &value("ODT", 1.3), 999).unwrap();
        assert_eq!(second, Upserted::Existing(first.id()));
        assert_eq!(get_value(&conn, first.id()).unwrap().coefficient, 1.3);
        assert_eq!(get_value(&conn, first.id()).unwrap().sort_order, 999);
    }
}
