// ==========================================
// HTTP 接口测试
// ==========================================
// 测试目标: multipart 上传 → 201 汇总 / 400 错误体，健康检查
// ==========================================


use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use inventory_import::app::{router, AppState};
use serde_json::Value;
use std::sync::Arc;
use test_helpers::*;
use tower::ServiceExt;

const BOUNDARY: &str = "----inventory-import-test";

fn multipart_body(field: &str, file_name: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n--{b}--\r\n",
        b = BOUNDARY,
        field = field,
        file_name = file_name,
        content = content
    )
}

fn upload_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn test_app(conn: &Arc<std::sync::Mutex<rusqlite::Connection>>) -> Router {
    let api = import_api(
        conn,
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );
    router(AppState::new(api, 2))
}

#[tokio::test]
async fn test_health() {
    let (_db_file, conn) = create_test_db().unwrap();
    let response = test_app(&conn)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_upload_product_returns_summary() {
    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");

    let content = format!(
        "{}\n{}\n{}",
        PRODUCT_HEADER,
        product_line("P-1", "WH-1", "S-1", "Bebidas", 12, 3),
        product_line("P-2", "WH-X", "S-1", "Bebidas", 4, 3)
    );
    let response = test_app(&conn)
        .oneshot(upload_request(
            "/csv/upload-product",
            multipart_body("file", "stock.csv", &content),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["totalRows"], 2);
    assert_eq!(body["productsCreated"], 1);
    assert_eq!(body["suppliersCreated"], 1);
    assert_eq!(body["errors"], 1);
    assert_eq!(body["errorDetails"][0]["reference"], "WH-X");
    assert!(body["runId"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_upload_warehouses_returns_summary() {
    let (_db_file, conn) = create_test_db().unwrap();

    let content = format!(
        "{}\n{}",
        WAREHOUSE_HEADER,
        warehouse_line("WH-1", "Central", "Bogota", "Cundinamarca", "", "")
    );
    let response = test_app(&conn)
        .oneshot(upload_request(
            "/csv/upload-warehouses",
            multipart_body("file", "almacenes.csv", &content),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["warehousesCreated"], 1);
    assert_eq!(body["citiesCreated"], 1);
}

#[tokio::test]
async fn test_unsupported_extension_is_bad_request() {
    let (_db_file, conn) = create_test_db().unwrap();
    let response = test_app(&conn)
        .oneshot(upload_request(
            "/csv/upload-product",
            multipart_body("file", "stock.pdf", PRODUCT_HEADER),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "文件格式错误");
    assert!(body["detalle"].as_str().unwrap().contains("pdf"));
}

#[tokio::test]
async fn test_missing_file_field_is_bad_request() {
    let (_db_file, conn) = create_test_db().unwrap();
    let response = test_app(&conn)
        .oneshot(upload_request(
            "/csv/upload-product",
            multipart_body("archivo", "stock.csv", PRODUCT_HEADER),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["detalle"].as_str().unwrap().contains("file"));
}
