use crate::db::coefficients::{
    create_type, create_value, delete_all_values, delete_type, delete_value, list_active_catalog,
    list_types, list_values_by_type, resolve_type, update_type, update_value,
};
use crate::db::history::recent_searches;
use crate::db::prices::{
    all_segments_with_path, clear_all_prices, create_segment, delete_locality, delete_segment,
    get_segment_with_path, list_localities, list_segments, list_streets, search_segments,
    update_segment, SegmentQuery,
};
use crate::db::settings::{load_brand, save_brand, BrandSettings};
use crate::db::Database;
use crate::domain::catalog::{NewTypeOptions, NewValue, TypeRef, TypeUpdate, ValueUpdate};
use crate::domain::prices::{NewSegment, SegmentUpdate};
use crate::errors::ServerError;
use crate::import::reconcile::ProgressFn;
use crate::import::{import_parsed, ImportProgress};
use crate::lookup::{lookup, LookupRequest};
use crate::responses::{html_response, json_or_error, json_response, json_with_status, ResultResp};
use crate::spreadsheets::{export_prices_xlsx, parse_workbook, preview_workbook};
use crate::templates;
use crate::templates::pages::AdminVm;
use astra::Request;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

/// Upload cap for imported workbooks.
const MAX_BODY_BYTES: u64 = 20 * 1024 * 1024;

const HISTORY_LIMIT: u32 = 20;

#[derive(Deserialize)]
struct NewTypeBody {
    code: String,
    name: String,
    #[serde(flatten)]
    opts: NewTypeOptions,
}

pub fn handle(req: Request, db: &Database) -> ResultResp {
    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();
    let params = parse_query(&req);
    let parts: Vec<&str> = path.trim_matches('/').split('/').collect();

    tracing::debug!(%method, %path, "request");

    match (method.as_str(), parts.as_slice()) {
        // Pages
        ("GET", [""]) => {
            let (brand, localities, catalog) = db.with_conn(|conn| {
                Ok((load_brand(conn)?, list_localities(conn)?, list_active_catalog(conn)?))
            })?;
            html_response(templates::pages::home_page(&brand, &localities, &catalog))
        }
        ("GET", ["admin"]) => {
            let query = segment_query(&params);
            let (brand, vm) = db.with_conn(|conn| {
                let vm = AdminVm {
                    segments: search_segments(conn, &query)?,
                    catalog: list_active_catalog(conn)?,
                    history: recent_searches(conn, HISTORY_LIMIT)?,
                    query: query.clone(),
                };
                Ok((load_brand(conn)?, vm))
            })?;
            html_response(templates::pages::admin_page(&brand, &vm))
        }

        // Lookup API
        ("GET", ["api", "localities"]) => api(|| {
            let localities = db.with_conn(|conn| Ok(list_localities(conn)?))?;
            json_response(&localities)
        }),
        ("GET", ["api", "streets"]) => api(|| {
            let locality_id = required_id(&params, "locality_id")?;
            let streets = db.with_conn(|conn| Ok(list_streets(conn, locality_id)?))?;
            json_response(&streets)
        }),
        ("GET", ["api", "segments"]) => api(|| {
            let street_id = required_id(&params, "street_id")?;
            let segments = db.with_conn(|conn| Ok(list_segments(conn, street_id)?))?;
            json_response(&segments)
        }),
        ("GET", ["api", "segments", id]) => api(|| {
            let id = parse_id(id)?;
            let segment = db.with_conn(|conn| Ok(get_segment_with_path(conn, id)?))?;
            json_response(&segment)
        }),
        ("GET", ["api", "coefficient-types"]) => api(|| {
            let types = db.with_conn(|conn| Ok(list_types(conn)?))?;
            json_response(&types)
        }),
        ("GET", ["api", "coefficients"]) => api(|| {
            let raw = params
                .get("type")
                .ok_or_else(|| ServerError::BadRequest("type is required".into()))?;
            let values =
                db.with_conn(|conn| Ok(list_values_by_type(conn, &TypeRef::parse(raw))?))?;
            json_response(&values)
        }),
        ("GET", ["api", "catalog"]) => api(|| {
            let catalog = db.with_conn(|conn| Ok(list_active_catalog(conn)?))?;
            json_response(&catalog)
        }),
        ("POST", ["api", "valuate"]) => api(|| {
            let body: LookupRequest = read_json(req)?;
            let result = db.with_conn(|conn| lookup(conn, &body))?;
            json_response(&result)
        }),

        // Admin: spreadsheets
        ("POST", ["admin", "import"]) => api(|| {
            let bytes = read_body(req)?;
            let parsed = parse_workbook(&bytes)?;
            let mut log_progress = |p: ImportProgress| {
                tracing::debug!(stage = ?p.stage, current = p.current, total = p.total, "{}", p.message);
            };
            let progress: ProgressFn = &mut log_progress;
            let result = db.with_conn(|conn| Ok(import_parsed(conn, &parsed, Some(progress))))?;
            json_response(&result)
        }),
        ("POST", ["admin", "import", "preview"]) => api(|| {
            let bytes = read_body(req)?;
            json_response(&preview_workbook(&bytes)?)
        }),
        ("GET", ["admin", "export.xlsx"]) => {
            let (segments, catalog) = db.with_conn(|conn| {
                Ok((all_segments_with_path(conn)?, list_active_catalog(conn)?))
            })?;
            export_prices_xlsx(&segments, &catalog)
        }

        // Admin API: price hierarchy
        ("GET", ["api", "admin", "segments"]) => api(|| {
            let query = segment_query(&params);
            let page = db.with_conn(|conn| Ok(search_segments(conn, &query)?))?;
            json_response(&page)
        }),
        ("POST", ["api", "admin", "segments"]) => api(|| {
            let body: NewSegment = read_json(req)?;
            let created = db.with_conn(|conn| Ok(create_segment(conn, &body)?))?;
            json_with_status(201, &created)
        }),
        ("PUT", ["api", "admin", "segments", id]) => api(|| {
            let id = parse_id(id)?;
            let body: SegmentUpdate = read_json(req)?;
            let updated = db.with_conn(|conn| Ok(update_segment(conn, id, &body)?))?;
            json_response(&updated)
        }),
        ("DELETE", ["api", "admin", "segments", id]) => api(|| {
            let id = parse_id(id)?;
            db.with_conn(|conn| Ok(delete_segment(conn, id)?))?;
            json_response(&serde_json::json!({ "deleted": id }))
        }),
        ("DELETE", ["api", "admin", "localities", id]) => api(|| {
            let id = parse_id(id)?;
            db.with_conn(|conn| Ok(delete_locality(conn, id)?))?;
            json_response(&serde_json::json!({ "deleted": id }))
        }),
        ("POST", ["api", "admin", "clear-prices"]) => api(|| {
            let cleared = db.with_conn(|conn| Ok(clear_all_prices(conn)?))?;
            json_response(&cleared)
        }),

        // Admin API: coefficient catalog
        ("POST", ["api", "admin", "coefficient-types"]) => api(|| {
            let body: NewTypeBody = read_json(req)?;
            let created =
                db.with_conn(|conn| Ok(create_type(conn, &body.code, &body.name, &body.opts)?))?;
            json_with_status(201, &created)
        }),
        ("PUT", ["api", "admin", "coefficient-types", id]) => api(|| {
            let id = parse_id(id)?;
            let body: TypeUpdate = read_json(req)?;
            let updated = db.with_conn(|conn| Ok(update_type(conn, id, &body)?))?;
            json_response(&updated)
        }),
        ("DELETE", ["api", "admin", "coefficient-types", id]) => api(|| {
            let id = parse_id(id)?;
            let values = db.with_conn(|conn| Ok(delete_type(conn, id)?))?;
            json_response(&serde_json::json!({ "deleted": id, "values": values }))
        }),
        ("POST", ["api", "admin", "coefficient-types", type_ref, "values"]) => {
            api(|| {
                let type_ref = TypeRef::parse(type_ref);
                let body: NewValue = read_json(req)?;
                let created = db.with_conn(|conn| {
                    let ty = resolve_type(conn, &type_ref)?;
                    Ok(create_value(conn, ty.id, &body)?)
                })?;
                json_with_status(201, &created)
            })
        }
        ("DELETE", ["api", "admin", "coefficient-types", type_ref, "values"]) => {
            api(|| {
                let type_ref = TypeRef::parse(type_ref);
                let deleted = db.with_conn(|conn| {
                    let ty = resolve_type(conn, &type_ref)?;
                    Ok(delete_all_values(conn, ty.id)?)
                })?;
                json_response(&serde_json::json!({ "deleted": deleted }))
            })
        }
        ("PUT", ["api", "admin", "coefficient-values", id]) => api(|| {
            let id = parse_id(id)?;
            let body: ValueUpdate = read_json(req)?;
            let updated = db.with_conn(|conn| Ok(update_value(conn, id, &body)?))?;
            json_response(&updated)
        }),
        ("DELETE", ["api", "admin", "coefficient-values", id]) => api(|| {
            let id = parse_id(id)?;
            db.with_conn(|conn| Ok(delete_value(conn, id)?))?;
            json_response(&serde_json::json!({ "deleted": id }))
        }),

        // Admin API: branding and history
        ("GET", ["api", "admin", "brand"]) => api(|| {
            let brand = db.with_conn(|conn| load_brand(conn))?;
            json_response(&brand)
        }),
        ("PUT", ["api", "admin", "brand"]) => api(|| {
            let body: BrandSettings = read_json(req)?;
            db.with_conn(|conn| save_brand(conn, &body))?;
            json_response(&body)
        }),
        ("GET", ["api", "admin", "history"]) => api(|| {
            let limit = params
                .get("limit")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(HISTORY_LIMIT);
            let history = db.with_conn(|conn| recent_searches(conn, limit))?;
            json_response(&history)
        }),

        _ => Err(ServerError::NotFound),
    }
}

/// JSON routes answer errors as JSON instead of the HTML error page.
fn api(f: impl FnOnce() -> ResultResp) -> ResultResp {
    Ok(json_or_error(f()))
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn segment_query(params: &HashMap<String, String>) -> SegmentQuery {
    let defaults = SegmentQuery::default();
    let id = |key: &str| params.get(key).and_then(|v| v.parse::<i64>().ok());
    let num = |key: &str| params.get(key).and_then(|v| v.parse::<u32>().ok()).filter(|n| *n > 0);

    SegmentQuery {
        search: params
            .get("search")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        district_id: id("locality_id"),
        street_id: id("street_id"),
        page: num("page").unwrap_or(defaults.page),
        page_size: num("page_size").unwrap_or(defaults.page_size),
    }
}

fn parse_id(raw: &str) -> Result<i64, ServerError> {
    raw.parse::<i64>()
        .map_err(|_| ServerError::BadRequest(format!("Invalid id: {raw}")))
}

fn required_id(params: &HashMap<String, String>, key: &str) -> Result<i64, ServerError> {
    let raw = params
        .get(key)
        .ok_or_else(|| ServerError::BadRequest(format!("{key} is required")))?;
    parse_id(raw)
}

fn read_body(req: Request) -> Result<Vec<u8>, ServerError> {
    let mut bytes = Vec::new();
    req.into_body()
        .reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| ServerError::BadRequest(format!("Failed to read body: {e}")))?;

    if bytes.len() as u64 > MAX_BODY_BYTES {
        return Err(ServerError::BadRequest("Request body too large".into()));
    }
    if bytes.is_empty() {
        return Err(ServerError::BadRequest("Request body is empty".into()));
    }
    Ok(bytes)
}

fn read_json<T: DeserializeOwned>(req: Request) -> Result<T, ServerError> {
    let bytes = read_body(req)?;
    serde_json::from_slice(&bytes).map_err(|e| ServerError::BadRequest(format!("Invalid JSON: {e}")))
}
