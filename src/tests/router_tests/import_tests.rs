use crate::router::handle;
use crate::spreadsheets::parse_xlsx::tests::{build_workbook, price_header, Cell};
use crate::tests::utils::{body_json, get, init_test_db, send};
use http::Method;
use Cell::{E, N, S};

fn sample_workbook() -> Vec<u8> {
    build_workbook(&[
        (
            "Giá đất",
            vec![
                price_header(),
                vec![S("Phường 1"), S("Lê Lợi"), S("Cầu"), S("Chợ"), N(1_000_000.0), N(2_000_000.0), N(900_000.0)],
                vec![S("Phường 1"), S("Lê Lợi"), S("Chợ"), S("Sông"), N(800_000.0), N(1_000_000.0), E],
                vec![S("Phường 2"), S("Hùng Vương"), E, E, N(700_000.0), N(900_000.0), E],
            ],
        ),
        (
            "Chiều sâu",
            vec![
                vec![S("Mã"), S("Tên"), S("Hệ số"), S("Chiều sâu min"), S("Chiều sâu max")],
                vec![S("D1"), S("0 - 20m"), N(1.0), N(0.0), N(20.0)],
                vec![S("D2"), S("20 - 40m"), N(0.9), N(20.0), N(40.0)],
            ],
        ),
    ])
}

#[test]
fn import_creates_then_rematches() {
    let (_dir, db) = init_test_db();

    let resp = handle(send(Method::POST, "/admin/import", sample_workbook()), &db)
        .expect("Handler failed");
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert_eq!(body["success"], true, "{body}");
    assert_eq!(body["stats"]["districtsCreated"], 2);
    assert_eq!(body["stats"]["streetsCreated"], 2);
    assert_eq!(body["stats"]["segmentsCreated"], 3);
    assert_eq!(body["stats"]["coefficientsCreated"], 2);

    let again = body_json(
        handle(send(Method::POST, "/admin/import", sample_workbook()), &db).unwrap(),
    );
    assert_eq!(again["stats"]["districtsCreated"], 0);
    assert_eq!(again["stats"]["districtsUpdated"], 2);
    assert_eq!(again["stats"]["segmentsUpdated"], 3);
    assert_eq!(again["stats"]["coefficientsUpdated"], 2);

    let page = body_json(handle(get("/api/admin/segments?page_size=50"), &db).unwrap());
    assert_eq!(page["total"], 3);
}

#[test]
fn preview_classifies_sheets() {
    let (_dir, db) = init_test_db();

    let resp = handle(send(Method::POST, "/admin/import/preview", sample_workbook()), &db)
        .expect("Handler failed");
    let body = body_json(resp);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["sheets"][0]["kind"], "prices");
    assert_eq!(body["sheets"][1]["kind"], "coefficients");
    assert_eq!(body["sheets"][0]["rowCount"], 3);
}

#[test]
fn empty_upload_is_rejected() {
    let (_dir, db) = init_test_db();
    let resp = handle(send(Method::POST, "/admin/import", Vec::new()), &db).unwrap();
    assert_eq!(resp.status(), 400);
}

#[test]
fn export_is_an_xlsx_download() {
    let (_dir, db) = init_test_db();
    handle(send(Method::POST, "/admin/import", sample_workbook()), &db).unwrap();

    let resp = handle(get("/admin/export.xlsx"), &db).expect("Handler failed");
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["Content-Type"],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert!(resp.headers()["Content-Disposition"]
        .to_str()
        .unwrap()
        .contains("bang_gia_dat.xlsx"));
}
