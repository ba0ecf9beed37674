use crate::router::handle;
use crate::tests::utils::{body_json, get, init_test_db, post_json, send};
use http::Method;
use serde_json::json;

fn create_segment(db: &crate::db::Database) -> i64 {
    let req = post_json(
        "/api/admin/segments",
        json!({
            "district_name": "Phường 1",
            "street_name": "Lê Lợi",
            "segment_from": "Đầu đường",
            "segment_to": "Cuối đường",
            "base_price_min": 800_000.0,
            "base_price_max": 1_200_000.0
        }),
    );
    let resp = handle(req, db).expect("Handler failed");
    assert_eq!(resp.status(), 201);
    body_json(resp)["id"].as_i64().expect("segment id")
}

fn add_value(db: &crate::db::Database, axis: &str, code: &str, coefficient: f64) {
    let req = post_json(
        &format!("/api/admin/coefficient-types/{axis}/values"),
        json!({ "code": code, "name": code, "coefficient": coefficient }),
    );
    let resp = handle(req, db).expect("Handler failed");
    assert_eq!(resp.status(), 201, "creating {axis}/{code}");
}

#[test]
fn hierarchy_is_browsable_top_down() {
    let (_dir, db) = init_test_db();
    let segment_id = create_segment(&db);

    let localities = body_json(handle(get("/api/localities"), &db).unwrap());
    assert_eq!(localities[0]["name"], "Phường 1");
    let locality_id = localities[0]["id"].as_i64().unwrap();

    let streets = body_json(
        handle(get(&format!("/api/streets?locality_id={locality_id}")), &db).unwrap(),
    );
    assert_eq!(streets[0]["name"], "Lê Lợi");
    let street_id = streets[0]["id"].as_i64().unwrap();

    let segments = body_json(
        handle(get(&format!("/api/segments?street_id={street_id}")), &db).unwrap(),
    );
    assert_eq!(segments[0]["id"].as_i64(), Some(segment_id));
    assert_eq!(segments[0]["segment_from"], "Đầu đường");
}

#[test]
fn missing_query_parameter_is_a_json_bad_request() {
    let (_dir, db) = init_test_db();
    let resp = handle(get("/api/streets"), &db).expect("Handler failed");
    assert_eq!(resp.status(), 400);
    assert!(body_json(resp)["error"]
        .as_str()
        .unwrap()
        .contains("locality_id"));
}

#[test]
fn valuate_by_codes() {
    let (_dir, db) = init_test_db();
    let segment_id = create_segment(&db);
    add_value(&db, "land_type", "ODT", 1.2);
    add_value(&db, "location", "VT1", 1.1);
    add_value(&db, "area", "S1", 0.95);
    add_value(&db, "depth", "D1", 1.0);
    add_value(&db, "feng_shui", "DN", 1.05);

    let req = post_json(
        "/api/valuate",
        json!({
            "segmentId": segment_id,
            "area": 150.0,
            "codes": {
                "landType": "ODT",
                "location": "VT1",
                "area": "S1",
                "depth": "D1",
                "fengShui": "DN"
            }
        }),
    );
    let resp = handle(req, &db).expect("Handler failed");
    assert_eq!(resp.status(), 200);

    let body = body_json(resp);
    assert_eq!(body["valuation"]["pricePerM2"]["min"], 1_053_360);
    assert_eq!(body["valuation"]["totalPrice"]["avg"], 197_505_000);
    assert_eq!(body["display"]["totalPrice"], "197.5 triệu");
    assert_eq!(body["segment"]["street_name"], "Lê Lợi");

    let history = body_json(handle(get("/api/admin/history"), &db).unwrap());
    assert_eq!(history.as_array().map(Vec::len), Some(1));
}

#[test]
fn valuate_rejects_unknown_code() {
    let (_dir, db) = init_test_db();
    let segment_id = create_segment(&db);

    let req = post_json(
        "/api/valuate",
        json!({ "segmentId": segment_id, "area": 100.0, "codes": { "depth": "D9" } }),
    );
    let resp = handle(req, &db).expect("Handler failed");
    assert_eq!(resp.status(), 400);
}

#[test]
fn valuate_rejects_axes_outside_the_canonical_five() {
    let (_dir, db) = init_test_db();
    let segment_id = create_segment(&db);
    let req = post_json(
        "/api/admin/coefficient-types",
        json!({ "code": "frontage", "name": "Mặt tiền" }),
    );
    assert_eq!(handle(req, &db).unwrap().status(), 201);
    add_value(&db, "frontage", "MT1", 1.3);

    let req = post_json(
        "/api/valuate",
        json!({ "segmentId": segment_id, "area": 100.0, "codes": { "frontage": "MT1" } }),
    );
    let resp = handle(req, &db).expect("Handler failed");
    assert_eq!(resp.status(), 400);
    assert!(body_json(handle(get("/api/admin/history"), &db).unwrap())
        .as_array()
        .is_some_and(Vec::is_empty));
}

#[test]
fn value_update_with_null_clears_optional_fields() {
    let (_dir, db) = init_test_db();
    let req = post_json(
        "/api/admin/coefficient-types/location/values",
        json!({
            "code": "VT1",
            "name": "Vị trí 1",
            "coefficient": 1.1,
            "range": { "min": 4.0, "max": 8.0 },
            "description": "Mặt đường chính"
        }),
    );
    let created = body_json(handle(req, &db).expect("Handler failed"));
    let id = created["id"].as_i64().expect("value id");
    assert_eq!(created["range_max"], 8.0);

    let req = send(
        Method::PUT,
        &format!("/api/admin/coefficient-values/{id}"),
        json!({ "range_max": null, "description": null }).to_string(),
    );
    let resp = handle(req, &db).expect("Handler failed");
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert!(body["range_max"].is_null());
    assert!(body["description"].is_null());
    assert_eq!(body["range_min"], 4.0);
    assert_eq!(body["name"], "Vị trí 1");
}

#[test]
fn malformed_json_is_a_bad_request() {
    let (_dir, db) = init_test_db();
    let resp = handle(send(Method::POST, "/api/valuate", "{not json"), &db).expect("Handler failed");
    assert_eq!(resp.status(), 400);
}

#[test]
fn duplicate_value_code_is_rejected() {
    let (_dir, db) = init_test_db();
    add_value(&db, "depth", "D1", 1.0);

    let req = post_json(
        "/api/admin/coefficient-types/depth/values",
        json!({ "code": "D1", "name": "again", "coefficient": 0.9 }),
    );
    let resp = handle(req, &db).expect("Handler failed");
    assert_eq!(resp.status(), 400);

    let values = body_json(handle(get("/api/coefficients?type=depth"), &db).unwrap());
    assert_eq!(values.as_array().map(Vec::len), Some(1));
    assert_eq!(values[0]["type"]["code"], "depth");
}

#[test]
fn segment_update_keeps_prices_ordered() {
    let (_dir, db) = init_test_db();
    let id = create_segment(&db);

    let req = send(
        Method::PUT,
        &format!("/api/admin/segments/{id}"),
        json!({ "base_price_min": 5_000_000.0 }).to_string(),
    );
    let resp = handle(req, &db).expect("Handler failed");
    assert_eq!(resp.status(), 400);

    let req = send(
        Method::PUT,
        &format!("/api/admin/segments/{id}"),
        json!({ "base_price_max": 1_500_000.0 }).to_string(),
    );
    let body = body_json(handle(req, &db).expect("Handler failed"));
    assert_eq!(body["base_price_max"], 1_500_000.0);
}

#[test]
fn clear_prices_reports_counts() {
    let (_dir, db) = init_test_db();
    create_segment(&db);

    let resp = handle(send(Method::POST, "/api/admin/clear-prices", ""), &db).unwrap();
    let body = body_json(resp);
    assert_eq!(body["segments"], 1);
    assert_eq!(body["streets"], 1);
    assert_eq!(body["districts"], 1);

    let localities = body_json(handle(get("/api/localities"), &db).unwrap());
    assert_eq!(localities.as_array().map(Vec::len), Some(0));
}

#[test]
fn brand_round_trips() {
    let (_dir, db) = init_test_db();
    let req = send(
        Method::PUT,
        "/api/admin/brand",
        json!({
            "app_name": "Bảng giá",
            "branch_name": "CN Trà Vinh",
            "slogan": "",
            "logo_url": null
        })
        .to_string(),
    );
    assert_eq!(handle(req, &db).unwrap().status(), 200);

    let brand = body_json(handle(get("/api/admin/brand"), &db).unwrap());
    assert_eq!(brand["app_name"], "Bảng giá");
    assert_eq!(brand["branch_name"], "CN Trà Vinh");
}
