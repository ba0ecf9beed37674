// src/db/prices.rs
//! Locality -> street -> segment hierarchy.
//!
//! Upserts are keyed on the UNIQUE natural keys in the schema
//! (`districts.name`, `streets(district_id, name)`,
//! `segments(street_id, segment_from, segment_to)`), so two imports racing on
//! the same row converge on one record instead of inserting twice.
use crate::db::{execute_update, is_unique_violation, Upserted};
use crate::domain::prices::{
    initials_code, ClearedPrices, Locality, NewSegment, Segment, SegmentPrices, SegmentUpdate,
    SegmentWithPath, Street,
};
use crate::errors::CatalogError;
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

const MAX_CODE_ATTEMPTS: usize = 50;

const SEGMENT_COLUMNS: &str = "s.id, s.street_id, s.segment_from, s.segment_to, s.base_price_min, \
     s.base_price_max, s.government_price, s.adjustment_coef_min, s.adjustment_coef_max, \
     s.created_at, s.updated_at";

fn segment_from_row(r: &Row) -> rusqlite::Result<Segment> {
    Ok(Segment {
        id: r.get(0)?,
        street_id: r.get(1)?,
        segment_from: r.get(2)?,
        segment_to: r.get(3)?,
        base_price_min: r.get(4)?,
        base_price_max: r.get(5)?,
        government_price: r.get(6)?,
        adjustment_coef_min: r.get(7)?,
        adjustment_coef_max: r.get(8)?,
        created_at: r.get(9)?,
        updated_at: r.get(10)?,
    })
}

fn segment_with_path_from_row(r: &Row) -> rusqlite::Result<SegmentWithPath> {
    Ok(SegmentWithPath {
        segment: segment_from_row(r)?,
        street_name: r.get(11)?,
        district_id: r.get(12)?,
        district_name: r.get(13)?,
    })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub fn list_localities(conn: &Connection) -> Result<Vec<Locality>, CatalogError> {
    let mut stmt = conn.prepare(
        "select id, code, name, sort_order, created_at from districts order by sort_order asc, name asc",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Locality {
            id: r.get(0)?,
            code: r.get(1)?,
            name: r.get(2)?,
            sort_order: r.get(3)?,
            created_at: r.get(4)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn list_streets(conn: &Connection, district_id: i64) -> Result<Vec<Street>, CatalogError> {
    let mut stmt = conn.prepare(
        "select id, district_id, code, name, created_at from streets where district_id = ? order by name asc",
    )?;
    let rows = stmt.query_map(params![district_id], |r| {
        Ok(Street {
            id: r.get(0)?,
            district_id: r.get(1)?,
            code: r.get(2)?,
            name: r.get(3)?,
            created_at: r.get(4)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn list_segments(conn: &Connection, street_id: i64) -> Result<Vec<Segment>, CatalogError> {
    let mut stmt = conn.prepare(&format!(
        "select {SEGMENT_COLUMNS} from segments s where s.street_id = ? order by s.segment_from asc, s.id asc"
    ))?;
    let rows = stmt.query_map(params![street_id], segment_from_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_segment(conn: &Connection, id: i64) -> Result<Segment, CatalogError> {
    conn.query_row(
        &format!("select {SEGMENT_COLUMNS} from segments s where s.id = ?"),
        params![id],
        segment_from_row,
    )
    .optional()?
    .ok_or_else(|| CatalogError::not_found("segment", id))
}

pub fn get_segment_with_path(conn: &Connection, id: i64) -> Result<SegmentWithPath, CatalogError> {
    conn.query_row(
        &format!(
            r#"
            select {SEGMENT_COLUMNS}, st.name, d.id, d.name
            from segments s
            join streets st on st.id = s.street_id
            join districts d on d.id = st.district_id
            where s.id = ?
            "#
        ),
        params![id],
        segment_with_path_from_row,
    )
    .optional()?
    .ok_or_else(|| CatalogError::not_found("segment", id))
}

/// Filters for the admin price table.
#[derive(Debug, Clone)]
pub struct SegmentQuery {
    pub search: Option<String>,
    pub district_id: Option<i64>,
    pub street_id: Option<i64>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for SegmentQuery {
    fn default() -> Self {
        Self {
            search: None,
            district_id: None,
            street_id: None,
            page: 1,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentPage {
    pub data: Vec<SegmentWithPath>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Newest first. A street filter wins over a locality filter; the search
/// text matches either segment label.
pub fn search_segments(conn: &Connection, q: &SegmentQuery) -> Result<SegmentPage, CatalogError> {
    let mut clauses = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(street_id) = q.street_id {
        clauses.push("s.street_id = ?");
        args.push(street_id.into());
    } else if let Some(district_id) = q.district_id {
        clauses.push("st.district_id = ?");
        args.push(district_id.into());
    }
    if let Some(search) = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        clauses.push("(s.segment_from like ? or s.segment_to like ?)");
        let pattern = format!("%{search}%");
        args.push(pattern.clone().into());
        args.push(pattern.into());
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("where {}", clauses.join(" and "))
    };

    let from_sql = "from segments s \
         join streets st on st.id = s.street_id \
         join districts d on d.id = st.district_id";

    let total: i64 = conn.query_row(
        &format!("select count(*) {from_sql} {where_sql}"),
        params_from_iter(args.iter()),
        |r| r.get(0),
    )?;

    let page = q.page.max(1);
    let page_size = q.page_size.clamp(1, 500);
    let mut page_args = args.clone();
    page_args.push(i64::from(page_size).into());
    page_args.push((i64::from(page - 1) * i64::from(page_size)).into());

    let mut stmt = conn.prepare(&format!(
        "select {SEGMENT_COLUMNS}, st.name, d.id, d.name {from_sql} {where_sql} \
         order by s.created_at desc, s.id desc limit ? offset ?"
    ))?;
    let rows = stmt.query_map(params_from_iter(page_args.iter()), segment_with_path_from_row)?;

    let mut data = Vec::new();
    for r in rows {
        data.push(r?);
    }
    Ok(SegmentPage {
        data,
        total,
        page,
        page_size,
    })
}

/// Every segment with its path, ordered the way the export sheet lists them.
pub fn all_segments_with_path(conn: &Connection) -> Result<Vec<SegmentWithPath>, CatalogError> {
    let mut stmt = conn.prepare(&format!(
        r#"
        select {SEGMENT_COLUMNS}, st.name, d.id, d.name
        from segments s
        join streets st on st.id = s.street_id
        join districts d on d.id = st.district_id
        order by d.sort_order, d.name, st.name, s.segment_from
        "#
    ))?;
    let rows = stmt.query_map([], segment_with_path_from_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Natural-key upserts
// ---------------------------------------------------------------------------

/// Where a newly created locality goes in the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPlacement {
    /// After every existing locality.
    Last,
    Fixed(i64),
}

/// Find a locality by exact name or create it with a code built from the
/// name's initials. Code collisions get a numeric suffix.
pub fn upsert_locality(
    conn: &Connection,
    name: &str,
    placement: SortPlacement,
) -> Result<Upserted, CatalogError> {
    let base_code = initials_code(name);
    let now = Utc::now().naive_utc();

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = if attempt == 1 {
            base_code.clone()
        } else {
            format!("{base_code}{attempt}")
        };

        let inserted = match placement {
            SortPlacement::Fixed(order) => conn.execute(
                r#"
                insert into districts (code, name, sort_order, created_at)
                values (?1, ?2, ?3, ?4)
                on conflict(name) do nothing
                "#,
                params![code, name, order, now],
            ),
            SortPlacement::Last => conn.execute(
                r#"
                insert into districts (code, name, sort_order, created_at)
                select ?1, ?2, coalesce(max(sort_order), 0) + 1, ?3 from districts
                where true
                on conflict(name) do nothing
                "#,
                params![code, name, now],
            ),
        };

        match inserted {
            Ok(1) => return Ok(Upserted::Created(conn.last_insert_rowid())),
            Ok(_) => {
                let id: i64 = conn.query_row(
                    "select id from districts where name = ?",
                    params![name],
                    |r| r.get(0),
                )?;
                return Ok(Upserted::Existing(id));
            }
            // the name is free but the code is taken: try the next suffix
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(CatalogError::DuplicateCode { code: base_code })
}

pub fn upsert_street(
    conn: &Connection,
    district_id: i64,
    name: &str,
) -> Result<Upserted, CatalogError> {
    let now = Utc::now().naive_utc();
    let inserted = conn.execute(
        r#"
        insert into streets (district_id, code, name, created_at)
        values (?1, ?2, ?3, ?4)
        on conflict(district_id, name) do nothing
        "#,
        params![district_id, initials_code(name), name, now],
    )?;
    if inserted == 1 {
        return Ok(Upserted::Created(conn.last_insert_rowid()));
    }

    let id: i64 = conn.query_row(
        "select id from streets where district_id = ? and name = ?",
        params![district_id, name],
        |r| r.get(0),
    )?;
    Ok(Upserted::Existing(id))
}

/// Insert a segment, or overwrite the five numeric fields of the one already
/// at (street, from, to) and bump its `updated_at`.
pub fn upsert_segment(
    conn: &Connection,
    street_id: i64,
    segment_from: &str,
    segment_to: &str,
    prices: &SegmentPrices,
) -> Result<Upserted, CatalogError> {
    let now = Utc::now().naive_utc();
    if insert_segment(conn, street_id, segment_from, segment_to, prices, now)? {
        return Ok(Upserted::Created(conn.last_insert_rowid()));
    }

    let id: i64 = conn.query_row(
        r#"
        update segments set
            base_price_min = ?4, base_price_max = ?5, government_price = ?6,
            adjustment_coef_min = ?7, adjustment_coef_max = ?8, updated_at = ?9
        where street_id = ?1 and segment_from = ?2 and segment_to = ?3
        returning id
        "#,
        params![
            street_id,
            segment_from,
            segment_to,
            prices.base_price_min,
            prices.base_price_max,
            prices.government_price,
            prices.adjustment_coef_min,
            prices.adjustment_coef_max,
            now,
        ],
        |r| r.get(0),
    )?;
    Ok(Upserted::Existing(id))
}

/// Returns false when the natural key already exists.
fn insert_segment(
    conn: &Connection,
    street_id: i64,
    segment_from: &str,
    segment_to: &str,
    prices: &SegmentPrices,
    now: NaiveDateTime,
) -> Result<bool, CatalogError> {
    let inserted = conn.execute(
        r#"
        insert into segments (
            street_id, segment_from, segment_to, base_price_min, base_price_max,
            government_price, adjustment_coef_min, adjustment_coef_max, created_at, updated_at
        ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        on conflict(street_id, segment_from, segment_to) do nothing
        "#,
        params![
            street_id,
            segment_from,
            segment_to,
            prices.base_price_min,
            prices.base_price_max,
            prices.government_price,
            prices.adjustment_coef_min,
            prices.adjustment_coef_max,
            now,
        ],
    )?;
    Ok(inserted == 1)
}

// ---------------------------------------------------------------------------
// Admin writes
// ---------------------------------------------------------------------------

/// Create a segment addressed by locality and street names, creating either
/// parent if it does not exist yet.
pub fn create_segment(conn: &Connection, new: &NewSegment) -> Result<SegmentWithPath, CatalogError> {
    let district_name = new.district_name.trim();
    let street_name = new.street_name.trim();
    let from = new.segment_from.trim();
    let to = new.segment_to.trim();
    if district_name.is_empty() || street_name.is_empty() || from.is_empty() || to.is_empty() {
        return Err(CatalogError::Required("locality, street, segment from and segment to"));
    }
    new.prices.validate()?;

    let tx = conn.unchecked_transaction()?;
    let district = upsert_locality(&tx, district_name, SortPlacement::Last)?;
    let street = upsert_street(&tx, district.id(), street_name)?;

    let now = Utc::now().naive_utc();
    if !insert_segment(&tx, street.id(), from, to, &new.prices, now)? {
        return Err(CatalogError::DuplicateCode {
            code: format!("{street_name}: {from} - {to}"),
        });
    }
    let id = tx.last_insert_rowid();
    tx.commit()?;

    get_segment_with_path(conn, id)
}

/// Partial price update. The merged min/max must stay ordered.
pub fn update_segment(
    conn: &Connection,
    id: i64,
    update: &SegmentUpdate,
) -> Result<Segment, CatalogError> {
    if update.is_empty() {
        return Err(CatalogError::EmptyUpdate);
    }
    update.validate()?;
    let current = get_segment(conn, id)?;
    SegmentUpdate {
        base_price_min: Some(update.base_price_min.unwrap_or(current.base_price_min)),
        base_price_max: Some(update.base_price_max.unwrap_or(current.base_price_max)),
        ..Default::default()
    }
    .validate()?;

    let mut sets: Vec<(&str, Value)> = Vec::new();
    let fields = [
        ("base_price_min", update.base_price_min),
        ("base_price_max", update.base_price_max),
        ("government_price", update.government_price),
        ("adjustment_coef_min", update.adjustment_coef_min),
        ("adjustment_coef_max", update.adjustment_coef_max),
    ];
    for (col, value) in fields {
        if let Some(v) = value {
            sets.push((col, v.into()));
        }
    }
    execute_update(conn, "segments", id, sets)?;

    get_segment(conn, id)
}

pub fn delete_segment(conn: &Connection, id: i64) -> Result<(), CatalogError> {
    if conn.execute("delete from segments where id = ?", params![id])? == 0 {
        return Err(CatalogError::not_found("segment", id));
    }
    Ok(())
}

/// Removes the locality with all its streets and segments.
pub fn delete_locality(conn: &Connection, id: i64) -> Result<(), CatalogError> {
    if conn.execute("delete from districts where id = ?", params![id])? == 0 {
        return Err(CatalogError::not_found("locality", id));
    }
    Ok(())
}

/// Wipe all price data, children first.
pub fn clear_all_prices(conn: &Connection) -> Result<ClearedPrices, CatalogError> {
    let tx = conn.unchecked_transaction()?;
    let cleared = ClearedPrices {
        segments: tx.execute("delete from segments", [])?,
        streets: tx.execute("delete from streets", [])?,
        districts: tx.execute("delete from districts", [])?,
    };
    tx.commit()?;

    tracing::warn!(?cleared, "cleared all price data");
    Ok(cleared)
}
