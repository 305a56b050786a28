// ==========================================
// 商品库存导入集成测试
// ==========================================
// 测试目标: 完整商品管线（解析 → 引用解析 → 分块对账 → 流水 → 告警）
// ==========================================


use inventory_import::api::ApiError;
use inventory_import::domain::import::ProductImportSummary;
use inventory_import::importer::{ImportError, ProductImporter};
use inventory_import::logging;
use inventory_import::services::templates;
use std::sync::Arc;
use test_helpers::*;

/// 比较与运行无关的汇总字段
fn comparable(summary: &ProductImportSummary) -> ProductImportSummary {
    ProductImportSummary {
        run_id: String::new(),
        elapsed_ms: 0,
        ..summary.clone()
    }
}

#[tokio::test]
async fn test_unknown_warehouse_is_row_error() {
    logging::init_test();

    let (_db_file, conn) = create_test_db().unwrap();
    let identity = Arc::new(MockIdentity::new());
    let notifier = Arc::new(MockNotifier::default());
    let importer = product_importer(&conn, MockConfig::default(), identity, notifier);

    let csv = write_csv(PRODUCT_HEADER, &[&product_line("P-1", "WH-X", "", "", 5, 0)]);
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();

    assert_eq!(summary.total_rows, 1);
    assert_eq!(summary.products_created, 0);
    assert_eq!(summary.stocks_created, 0);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.error_details[0].row, 1);
    assert_eq!(summary.error_details[0].reference.as_deref(), Some("WH-X"));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM product"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM stock_movement"), 0);
}

#[tokio::test]
async fn test_update_delta_and_low_stock_alert() {
    logging::init_test();

    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");
    seed_stock(&conn, "P-1", "WH-1", 50, 10);

    let identity = Arc::new(MockIdentity::new());
    let notifier = Arc::new(MockNotifier::default());
    let importer = product_importer(&conn, MockConfig::default(), identity, notifier.clone());

    let csv = write_csv(PRODUCT_HEADER, &[&product_line("P-1", "WH-1", "", "", 3, 10)]);
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();

    assert_eq!(summary.errors, 0, "{:?}", summary.error_details);
    assert_eq!(summary.products_created, 0);
    assert_eq!(summary.stocks_updated, 1);
    assert_eq!(summary.movements_recorded, 1);
    assert_eq!(summary.low_stock_alerts, 1);
    assert!(summary.alerts_notified);
    assert_eq!(stock_quantity(&conn, "P-1", "WH-1"), 3);

    let movements = movements(&conn);
    assert_eq!(
        movements,
        vec![("P-1".to_string(), "UPDATE".to_string(), -47, 3)]
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, templates::LOW_STOCK);
    assert_eq!(sent[0].to, vec!["despacho@example.com".to_string()]);
    assert_eq!(sent[0].data["count"], 1);
    assert!(sent[0].data["table"].as_str().unwrap().contains("P-1 | WH-1 | 3 | 10"));
}

#[tokio::test]
async fn test_new_references_and_idempotent_rerun() {
    logging::init_test();

    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");

    let identity = Arc::new(MockIdentity::new());
    let notifier = Arc::new(MockNotifier::default());
    let importer = product_importer(&conn, MockConfig::default(), identity, notifier.clone());

    let csv = write_csv(
        PRODUCT_HEADER,
        &[
            &product_line("P-1", "WH-1", "S-1", "Lacteos", 20, 5),
            &product_line("P-2", "WH-1", "S-1", "lacteos", 30, 5),
        ],
    );

    let first = importer.import_file(csv.path(), "csv").await.unwrap();
    assert_eq!(first.errors, 0, "{:?}", first.error_details);
    assert_eq!(first.products_created, 2);
    assert_eq!(first.stocks_created, 2);
    assert_eq!(first.suppliers_created, 1);
    assert_eq!(first.categories_created, 1);
    assert_eq!(first.associations_created, 2);
    assert_eq!(first.movements_recorded, 2);
    assert_eq!(first.low_stock_alerts, 0);
    assert!(!first.alerts_notified);
    assert!(notifier.sent().is_empty());

    {
        let conn = conn.lock().unwrap();
        let supplier_name: String = conn
            .query_row("SELECT name FROM supplier WHERE id = 'S-1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(supplier_name, "Proveedor S-1");
        let category_name: String = conn
            .query_row("SELECT name FROM category", [], |row| row.get(0))
            .unwrap();
        assert_eq!(category_name, "Lacteos");
    }

    let second = importer.import_file(csv.path(), "csv").await.unwrap();
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.products_created, 0);
    assert_eq!(second.stocks_created, 0);
    assert_eq!(second.stocks_updated, 2);
    assert_eq!(second.suppliers_created, 0);
    assert_eq!(second.categories_created, 0);
    assert_eq!(second.associations_created, 0);
    assert_eq!(second.movements_recorded, 0);

    let movements = movements(&conn);
    assert_eq!(movements.len(), 2);
    assert!(movements.iter().all(|(_, kind, _, _)| kind == "CREATION"));
    assert_eq!(movements[0], ("P-1".to_string(), "CREATION".to_string(), 20, 20));
}

#[tokio::test]
async fn test_record_unchanged_updates_policy() {
    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");
    seed_stock(&conn, "P-1", "WH-1", 20, 5);

    let config = MockConfig {
        record_unchanged_updates: true,
        ..MockConfig::default()
    };
    let importer = product_importer(
        &conn,
        config,
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );

    let csv = write_csv(PRODUCT_HEADER, &[&product_line("P-1", "WH-1", "", "", 20, 5)]);
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();

    assert_eq!(summary.movements_recorded, 1);
    assert_eq!(movements(&conn), vec![("P-1".to_string(), "UPDATE".to_string(), 0, 20)]);
}

#[tokio::test]
async fn test_chunk_size_does_not_change_counts() {
    logging::init_test();

    let lines = vec![
        product_line("P-1", "WH-1", "S-1", "Bebidas", 5, 10),
        product_line("P-2", "WH-1", "S-2", "Snacks", 40, 10),
        product_line("P-1", "WH-2", "S-1", "Bebidas", 2, 0),
        product_line("P-3", "WH-X", "S-3", "Snacks", 7, 1),
        product_line("P-1", "WH-1", "S-1", "Bebidas", 8, 10),
        "P-4;WH-2;;;Producto P-4;;;;;1,0;;false;false;3;1;;;".to_string(),
        product_line("P-5", "WH-2", "", "", 0, 2),
    ];
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

    let mut summaries = Vec::new();
    for batch_size in [500, 2, 1] {
        let (_db_file, conn) = create_test_db().unwrap();
        seed_warehouse(&conn, "WH-1");
        seed_warehouse(&conn, "WH-2");

        let importer = product_importer(
            &conn,
            MockConfig::with_batch_size(batch_size),
            Arc::new(MockIdentity::new()),
            Arc::new(MockNotifier::default()),
        );
        let csv = write_csv(PRODUCT_HEADER, &refs);
        let summary = importer.import_file(csv.path(), "csv").await.unwrap();

        assert_eq!(stock_quantity(&conn, "P-1", "WH-1"), 8);
        summaries.push(comparable(&summary));
    }

    let baseline = &summaries[0];
    assert_eq!(baseline.total_rows, 7);
    assert_eq!(baseline.products_created, 3);
    assert_eq!(baseline.stocks_created, 4);
    assert_eq!(baseline.stocks_updated, 1);
    assert_eq!(baseline.errors, 2);
    // CREATION x4 + UPDATE(5 → 8)
    assert_eq!(baseline.movements_recorded, 5);
    // P-1@WH-1 (8 <= 10), P-5@WH-2 (0 <= 2)
    assert_eq!(baseline.low_stock_alerts, 2);
    for summary in &summaries[1..] {
        assert_eq!(summary, baseline);
    }
}

#[tokio::test]
async fn test_negative_stock_is_kept() {
    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");
    seed_stock(&conn, "P-1", "WH-1", 2, 0);

    let importer = product_importer(
        &conn,
        MockConfig::default(),
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );
    let csv = write_csv(PRODUCT_HEADER, &[&product_line("P-1", "WH-1", "", "", -5, 0)]);
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();

    assert_eq!(summary.errors, 0);
    assert_eq!(stock_quantity(&conn, "P-1", "WH-1"), -5);
    assert_eq!(movements(&conn), vec![("P-1".to_string(), "UPDATE".to_string(), -7, -5)]);
    // reorder_level = 0 不告警
    assert_eq!(summary.low_stock_alerts, 0);
}

#[tokio::test]
async fn test_alert_delivery_failure_is_not_fatal() {
    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");

    let notifier = Arc::new(MockNotifier::failing());
    let importer = product_importer(
        &conn,
        MockConfig::default(),
        Arc::new(MockIdentity::new()),
        notifier.clone(),
    );
    let csv = write_csv(PRODUCT_HEADER, &[&product_line("P-1", "WH-1", "", "", 1, 10)]);
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();

    assert_eq!(summary.stocks_created, 1);
    assert_eq!(summary.movements_recorded, 1);
    assert_eq!(summary.low_stock_alerts, 1);
    assert!(!summary.alerts_notified);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_alerts_without_dispatchers_or_role_lookup() {
    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");
    let csv = write_csv(PRODUCT_HEADER, &[&product_line("P-1", "WH-1", "", "", 1, 10)]);

    let notifier = Arc::new(MockNotifier::default());
    let importer = product_importer(
        &conn,
        MockConfig::default(),
        Arc::new(MockIdentity::new().without_dispatchers()),
        notifier.clone(),
    );
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();
    assert_eq!(summary.low_stock_alerts, 1);
    assert!(!summary.alerts_notified);

    let mut identity = MockIdentity::new();
    identity.fail_role_lookup = true;
    let importer = product_importer(
        &conn,
        MockConfig::default(),
        Arc::new(identity),
        notifier.clone(),
    );
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();
    assert_eq!(summary.low_stock_alerts, 1);
    assert!(!summary.alerts_notified);

    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_new_product_missing_price_is_row_error() {
    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");

    let importer = product_importer(
        &conn,
        MockConfig::default(),
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );
    let csv = write_csv(
        PRODUCT_HEADER,
        &[
            "P-9;WH-1;;;Producto P-9;;;;;1,0;;false;false;3;1;;;",
            "P-8;WH-1;;;Producto P-8;;;;abc;1,0;;false;false;3;1;;;",
        ],
    );
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();

    assert_eq!(summary.products_created, 0);
    assert_eq!(summary.errors, 2);
    assert!(summary.error_details[0].message.contains("precio_unitario"));
    assert!(summary.error_details[1].message.contains("abc"));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM product_warehouse_stock"), 0);
}

#[tokio::test]
async fn test_unsupported_format_is_fatal() {
    let (_db_file, conn) = create_test_db().unwrap();
    let importer = product_importer(
        &conn,
        MockConfig::default(),
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );
    let csv = write_csv(PRODUCT_HEADER, &[]);

    let err = importer.import_file(csv.path(), "pdf").await.unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    assert!(err.is_format_error());

    let api = import_api(
        &conn,
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );
    let err = api.import_products(csv.path(), "stock.pdf").await.unwrap_err();
    assert!(matches!(err, ApiError::FileFormat(_)));
}

#[tokio::test]
async fn test_import_api_uses_stored_config() {
    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");

    let api = import_api(
        &conn,
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );
    let csv = write_csv(
        PRODUCT_HEADER,
        &[
            &product_line("P-1", "WH-1", "", "", 4, 0),
            &product_line("P-2", "WH-1", "", "", 6, 0),
        ],
    );
    let summary = api.import_products(csv.path(), "Stock Enero.CSV").await.unwrap();

    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.products_created, 2);
    assert_eq!(summary.movements_recorded, 2);
}

#[tokio::test]
async fn test_sample_dataset_latin1_fixture() {
    logging::init_test();

    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-01");
    seed_warehouse(&conn, "WH-02");
    let notifier = Arc::new(MockNotifier::default());
    let importer = product_importer(
        &conn,
        MockConfig::default(),
        Arc::new(MockIdentity::new()),
        notifier.clone(),
    );

    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/datasets/productos_muestra.csv");
    let summary = importer.import_file(&path, "csv").await.unwrap();

    // 空白行被跳过，但行号仍按文件位置计算
    assert_eq!(summary.total_rows, 5);
    assert_eq!(summary.products_created, 3);
    assert_eq!(summary.stocks_created, 4);
    assert_eq!(summary.suppliers_created, 3);
    assert_eq!(summary.categories_created, 2);
    assert_eq!(summary.associations_created, 4);
    assert_eq!(summary.movements_recorded, 4);
    assert_eq!(summary.low_stock_alerts, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.error_details[0].row, 6);
    assert_eq!(summary.error_details[0].reference.as_deref(), Some("WH-99"));

    assert_eq!(stock_quantity(&conn, "P-100", "WH-02"), 5);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM category"), 2);
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM category WHERE name_key = 'lácteos'"
        ),
        1
    );
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM product_warehouse_stock \
             WHERE product_id = 'P-100' AND warehouse_id = 'WH-01' \
               AND last_restock = '2024-01-05' AND expiration_date = '2024-06-30'"
        ),
        1
    );
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM product WHERE id = 'P-101' AND requires_refrigeration = 1"
        ),
        1
    );
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_batch_keeps_earlier_batch_movements() {
    logging::init_test();

    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");
    conn.lock()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER fail_p2_stock BEFORE INSERT ON product_warehouse_stock
             WHEN NEW.product_id = 'P-2'
             BEGIN SELECT RAISE(ABORT, 'boom'); END;",
        )
        .unwrap();

    let importer = product_importer(
        &conn,
        MockConfig::with_batch_size(1),
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );
    let csv = write_csv(
        PRODUCT_HEADER,
        &[
            &product_line("P-1", "WH-1", "", "", 5, 0),
            &product_line("P-2", "WH-1", "", "", 7, 0),
        ],
    );
    let err = importer.import_file(csv.path(), "csv").await.unwrap_err();
    assert!(matches!(err, ImportError::Persistence { .. }), "{}", err);

    // 第一批已提交，库存与流水一同保留
    assert_eq!(stock_quantity(&conn, "P-1", "WH-1"), 5);
    assert_eq!(
        movements(&conn),
        vec![("P-1".to_string(), "CREATION".to_string(), 5, 5)]
    );
}

#[tokio::test]
async fn test_zero_batch_size_falls_back_to_single_row_batches() {
    let (_db_file, conn) = create_test_db().unwrap();
    seed_warehouse(&conn, "WH-1");
    let importer = product_importer(
        &conn,
        MockConfig::with_batch_size(0),
        Arc::new(MockIdentity::new()),
        Arc::new(MockNotifier::default()),
    );

    let csv = write_csv(
        PRODUCT_HEADER,
        &[
            &product_line("P-1", "WH-1", "", "", 5, 0),
            &product_line("P-2", "WH-1", "", "", 7, 0),
        ],
    );
    let summary = importer.import_file(csv.path(), "csv").await.unwrap();
    assert_eq!(summary.stocks_created, 2);
    assert_eq!(summary.movements_recorded, 2);
}
