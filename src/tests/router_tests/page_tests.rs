use crate::db::coefficients::{create_type, create_value, find_type_by_code};
use crate::db::prices::{upsert_locality, SortPlacement};
use crate::db::settings::{save_brand, BrandSettings};
use crate::domain::catalog::{NewTypeOptions, NewValue, DEPTH};
use crate::errors::ServerError;
use crate::router::handle;
use crate::tests::utils::{body_string, get, init_test_db};

#[test]
fn home_page_renders_brand_and_localities() {
    let (_dir, db) = init_test_db();
    db.with_conn(|conn| {
        save_brand(
            conn,
            &BrandSettings {
                app_name: "Giá đất Trà Vinh".into(),
                branch_name: "Chi nhánh 1".into(),
                ..Default::default()
            },
        )?;
        upsert_locality(conn, "Phường 1", SortPlacement::Last)?;
        Ok(())
    })
    .expect("seed");

    let resp = handle(get("/"), &db).expect("Handler failed");
    assert_eq!(resp.status(), 200);

    let body = body_string(resp);
    assert!(body.contains("Giá đất Trà Vinh"));
    assert!(body.contains("Phường 1"));
    assert!(body.contains("href=\"/admin\""));
}

#[test]
fn home_page_offers_only_canonical_axes() {
    let (_dir, db) = init_test_db();
    db.with_conn(|conn| {
        let value = |code: &str| NewValue {
            code: code.into(),
            name: format!("Giá trị {code}"),
            coefficient: 1.2,
            range: None,
            description: None,
        };
        let custom = create_type(conn, "frontage", "Mặt tiền", &NewTypeOptions::default())?;
        create_value(conn, custom.id, &value("MT1"))?;
        let depth = find_type_by_code(conn, DEPTH)?.ok_or(ServerError::NotFound)?;
        create_value(conn, depth.id, &value("D1"))?;
        Ok(())
    })
    .expect("seed");

    let body = body_string(handle(get("/"), &db).expect("Handler failed"));
    assert!(body.contains("data-axis=\"depth\""));
    assert!(body.contains("data-axis=\"landType\""));
    assert!(!body.contains("data-axis=\"frontage\""));
    assert!(!body.contains("Mặt tiền"));
}

#[test]
fn admin_page_lists_segments() {
    let (_dir, db) = init_test_db();
    let resp = handle(get("/admin?search=L%C3%AA&page=1"), &db).expect("Handler failed");
    assert_eq!(resp.status(), 200);

    let body = body_string(resp);
    assert!(body.contains("Quản trị bảng giá"));
    // the decoded search text is echoed back into the form
    assert!(body.contains("value=\"Lê\""));
}

#[test]
fn unknown_route_is_not_found() {
    let (_dir, db) = init_test_db();
    let err = handle(get("/nope"), &db).unwrap_err();
    assert!(matches!(err, ServerError::NotFound));
}
