// src/db/history.rs
use crate::errors::ServerError;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

/// One performed valuation, kept for the admin's lookup log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRecord {
    pub id: i64,
    pub district_name: Option<String>,
    pub street_name: Option<String>,
    pub segment_desc: Option<String>,
    pub area: Option<f64>,
    pub total_price: Option<i64>,
    pub coefficients_json: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewSearch<'a> {
    pub district_name: &'a str,
    pub street_name: &'a str,
    pub segment_desc: &'a str,
    pub area: f64,
    pub total_price: i64,
    pub coefficients_json: String,
}

pub fn record_search(conn: &Connection, search: &NewSearch) -> Result<i64, ServerError> {
    conn.execute(
        r#"
        insert into search_history (
            district_name, street_name, segment_desc, area, total_price, coefficients_json, created_at
        ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            search.district_name,
            search.street_name,
            search.segment_desc,
            search.area,
            search.total_price,
            search.coefficients_json,
            Utc::now().naive_utc(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Newest first.
pub fn recent_searches(conn: &Connection, limit: u32) -> Result<Vec<SearchRecord>, ServerError> {
    let mut stmt = conn.prepare(
        r#"
        select id, district_name, street_name, segment_desc, area, total_price,
               coefficients_json, created_at
        from search_history
        order by created_at desc, id desc
        limit ?
        "#,
    )?;
    let rows = stmt.query_map(params![limit], |r| {
        Ok(SearchRecord {
            id: r.get(0)?,
            district_name: r.get(1)?,
            street_name: r.get(2)?,
            segment_desc: r.get(3)?,
            area: r.get(4)?,
            total_price: r.get(5)?,
            coefficients_json: r.get(6)?,
            created_at: r.get(7)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
