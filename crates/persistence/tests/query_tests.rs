//! Search tests: filters, sorting, pagination and validation, run through the
//! services against the in-memory index.

mod common;

use common::*;
use tokio_test::assert_err;

use storefront_persistence::error::{StorageError, ValidationError};
use storefront_persistence::services::{InvoiceSearchParams, ProductSearchParams};

fn params() -> ProductSearchParams {
    ProductSearchParams::default()
}

/// Creates three products on different days.
async fn seed_catalog(h: &CatalogHarness) {
    h.store.set_now(ts("2024-02-01T09:00:00"));
    h.service.create(new_product("Linen Shirt", "250000")).await.unwrap();

    h.store.set_now(ts("2024-02-03T12:30:00"));
    h.service.create(new_product("Wool Coat", "900000")).await.unwrap();

    h.store.set_now(ts("2024-03-10T08:00:00"));
    h.service.create(new_product("Cotton Shirt", "150000")).await.unwrap();
}

// ============================================================================
// End-to-end filter scenario
// ============================================================================

#[tokio::test]
async fn test_price_and_date_window_returns_product() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            price_gte: Some("200000".to_string()),
            price_lte: Some("300000".to_string()),
            created_at_gte: Some("2024-02-01T00:00:00".to_string()),
            created_at_lte: Some("2024-02-05T23:59:59".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(hits.total, Some(1));
    assert_eq!(hits.items[0].name, "Linen Shirt");
    assert_eq!(hits.items[0].price, dec("250000"));
}

#[tokio::test]
async fn test_raising_lower_price_bound_excludes_product() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            price_gte: Some("300000".to_string()),
            created_at_gte: Some("2024-02-01T00:00:00".to_string()),
            created_at_lte: Some("2024-02-05T23:59:59".to_string()),
            ..params()
        })
        .await
        .unwrap();

    let names: Vec<&str> = hits.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Wool Coat"]);
}

#[tokio::test]
async fn test_lower_bound_only_has_no_upper_bound() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            price_gte: Some("200000".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(hits.total, Some(2));
    assert!(hits.items.iter().any(|p| p.price == dec("900000")));
}

#[tokio::test]
async fn test_upper_bound_only_has_no_lower_bound() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            price_lte: Some("250000".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(hits.total, Some(2));
    assert!(hits.items.iter().any(|p| p.price == dec("150000")));
}

#[tokio::test]
async fn test_no_filters_matches_everything() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h.service.search_products(&params()).await.unwrap();
    assert_eq!(hits.total, Some(3));
}

// ============================================================================
// Text search
// ============================================================================

#[tokio::test]
async fn test_free_text_query_matches_name() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            query: Some("shirt".to_string()),
            ..params()
        })
        .await
        .unwrap();

    assert_eq!(hits.total, Some(2));
}

#[tokio::test]
async fn test_free_text_query_matches_price_prefix() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            query: Some("90".to_string()),
            ..params()
        })
        .await
        .unwrap();

    let names: Vec<&str> = hits.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Wool Coat"]);
}

#[tokio::test]
async fn test_name_filter_combines_with_range() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            name: Some("shirt".to_string()),
            price_gte: Some("200000".to_string()),
            ..params()
        })
        .await
        .unwrap();

    let names: Vec<&str> = hits.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Linen Shirt"]);
}

#[tokio::test]
async fn test_blank_query_is_ignored() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            query: Some("   ".to_string()),
            ..params()
        })
        .await
        .unwrap();
    assert_eq!(hits.total, Some(3));
}

// ============================================================================
// Sorting and pagination
// ============================================================================

#[tokio::test]
async fn test_default_sort_is_id_descending() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;

    let hits = h.service.search_products(&params()).await.unwrap();
    let ids: Vec<i64> = hits.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_sort_by_price_then_name() {
    let h = CatalogHarness::new(sync_config());
    seed_catalog(&h).await;
    h.service.create(new_product("Alpaca Scarf", "250000")).await.unwrap();

    let hits = h
        .service
        .search_products(&ProductSearchParams {
            sort_by: Some("price:desc,name".to_string()),
            ..params()
        })
        .await
        .unwrap();

    let names: Vec<&str> = hits.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Wool Coat", "Alpaca Scarf", "Linen Shirt", "Cotton Shirt"]
    );
}

#[tokio::test]
async fn test_pagination_windows_results() {
    let h = CatalogHarness::new(sync_config());
    for i in 0..7 {
        h.service
            .create(new_product(&format!("Item {}", i), "1000"))
            .await
            .unwrap();
    }

    let first = h.service.search_products(&params()).await.unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first.total, Some(7));

    let second = h
        .service
        .search_products(&ProductSearchParams {
            offset: Some(5),
            ..params()
        })
        .await
        .unwrap();
    let ids: Vec<i64> = second.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

// ============================================================================
// Validation happens before the index is contacted
// ============================================================================

#[tokio::test]
async fn test_unknown_sort_field_is_rejected() {
    let h = CatalogHarness::new(sync_config());
    h.index.set_unavailable(true);

    let err = h
        .service
        .search_products(&ProductSearchParams {
            sort_by: Some("secret:desc".to_string()),
            ..params()
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::UnknownField { ref field, .. }) if field == "secret"
    ));
}

#[tokio::test]
async fn test_unparseable_date_bound_is_rejected() {
    let h = CatalogHarness::new(sync_config());
    h.index.set_unavailable(true);

    let err = h
        .service
        .search_products(&ProductSearchParams {
            created_at_gte: Some("01/02/2024".to_string()),
            ..params()
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::InvalidFilter { .. })
    ));
}

#[tokio::test]
async fn test_unparseable_price_bound_is_rejected() {
    let h = CatalogHarness::new(sync_config());
    h.index.set_unavailable(true);

    let result = h
        .service
        .search_products(&ProductSearchParams {
            price_lte: Some("cheap".to_string()),
            ..params()
        })
        .await;
    let err = assert_err!(result);
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_limit_above_maximum_is_rejected() {
    let h = CatalogHarness::new(sync_config());

    let err = h
        .service
        .search_products(&ProductSearchParams {
            limit: Some(11),
            ..params()
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::InvalidPagination { .. })
    ));
}

#[tokio::test]
async fn test_transport_error_surfaces() {
    let h = CatalogHarness::new(sync_config());
    h.index.set_unavailable(true);

    let err = h.service.search_products(&params()).await.unwrap_err();
    assert!(matches!(err, StorageError::Backend(_)));
}

// ============================================================================
// Invoices
// ============================================================================

#[tokio::test]
async fn test_invoice_search_defaults_to_id_ascending() {
    let h = InvoiceHarness::new(sync_config());
    h.service.create(new_invoice(1, "100", "paid")).await.unwrap();
    h.service.create(new_invoice(2, "200", "pending")).await.unwrap();
    h.service.create(new_invoice(1, "300", "paid")).await.unwrap();

    let hits = h
        .service
        .search_invoices(&InvoiceSearchParams::default())
        .await
        .unwrap();
    let ids: Vec<i64> = hits.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_invoice_search_rejects_product_fields() {
    let h = InvoiceHarness::new(sync_config());

    let err = h
        .service
        .search_invoices(&InvoiceSearchParams {
            sort_by: Some("price".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_invoice_search_by_date_window() {
    let h = InvoiceHarness::new(sync_config());
    h.store.set_now(ts("2024-01-15T10:00:00"));
    h.service.create(new_invoice(1, "100", "paid")).await.unwrap();
    h.store.set_now(ts("2024-02-15T10:00:00"));
    h.service.create(new_invoice(1, "200", "paid")).await.unwrap();

    let hits = h
        .service
        .search_invoices(&InvoiceSearchParams {
            created_at_gte: Some("2024-02-01T00:00:00".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.total, Some(1));
    assert_eq!(hits.items[0].total_amount, dec("200"));
}
