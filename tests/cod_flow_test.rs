mod common;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

use common::{address_json, line_json, TestApp};
use storefront_api::entities::{payment, Order, Payment};

#[tokio::test]
async fn cod_order_is_placed_in_one_step() {
    let app = TestApp::spawn().await;
    app.seed_country("DE", "EUR", dec!(4.00), dec!(0.19)).await;
    let product = app.seed_product("Widget", dec!(10.00), 5, &[]).await;

    let token = app.token_for(Uuid::new_v4(), &[]);
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/checkout/cod",
            Some(&token),
            Some(json!({
                "items": [line_json(&product, 2)],
                "shipping_method": "standard",
                "shipping_address": {
                    "full_name": "Test Customer",
                    "line1": "Hauptstr. 1",
                    "city": "Berlin",
                    "postal_code": "10115",
                    "country_code": "DE",
                },
                "customer_email": "cod@example.com",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "unexpected: {body}");
    let order_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    // 20.00 + 19% tax (3.80) + 4.00 shipping, in the country's currency.
    assert_eq!(body["amount"], "27.80");
    assert_eq!(body["currency"], "EUR");
    assert_eq!(body["status"], "pending");

    // Stock was decremented immediately; there is no gateway confirmation.
    assert_eq!(app.product_stock(product.id).await, 3);

    let payments = Payment::find()
        .filter(payment::Column::OrderId.eq(order_id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].method, "cash_on_delivery");
    assert_eq!(payments[0].status, "pending");
    assert_eq!(payments[0].transaction_id, None);

    // Customer confirmation and admin alert were sent inline.
    let recipients = app.emails.recipients();
    assert!(recipients.contains(&"cod@example.com".to_string()));
    assert!(recipients.contains(&"admin@example.com".to_string()));

    // The gateway was never involved.
    assert_eq!(app.gateway.session_count(), 0);
}

#[tokio::test]
async fn insufficient_stock_leaves_nothing_behind() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    let plenty = app.seed_product("Plenty", dec!(10.00), 10, &[]).await;
    let scarce = app.seed_product("Scarce", dec!(10.00), 1, &[]).await;

    let token = app.token_for(Uuid::new_v4(), &[]);
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/checkout/cod",
            Some(&token),
            Some(json!({
                "items": [line_json(&plenty, 2), line_json(&scarce, 3)],
                "shipping_method": "standard",
                "shipping_address": address_json(),
                "customer_email": "cod@example.com",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {body}");
    let details = body["details"].as_array().expect("shortage details");
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["product_id"], scarce.id.to_string());

    // No partial mutation: both stocks intact, no order or payment rows.
    assert_eq!(app.product_stock(plenty.id).await, 10);
    assert_eq!(app.product_stock(scarce.id).await, 1);
    assert_eq!(Order::find().count(&*app.db).await.unwrap(), 0);
    assert_eq!(Payment::find().count(&*app.db).await.unwrap(), 0);
    assert_eq!(app.emails.sent_count(), 0);
}

#[tokio::test]
async fn cod_email_failure_does_not_fail_the_order() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    let product = app.seed_product("Widget", dec!(10.00), 5, &[]).await;

    app.emails
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let token = app.token_for(Uuid::new_v4(), &[]);
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/checkout/cod",
            Some(&token),
            Some(json!({
                "items": [line_json(&product, 1)],
                "shipping_method": "standard",
                "shipping_address": address_json(),
                "customer_email": "cod@example.com",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "unexpected: {body}");
    assert_eq!(app.product_stock(product.id).await, 4);
}

#[tokio::test]
async fn unsupported_destination_is_rejected() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    let product = app.seed_product("Widget", dec!(10.00), 5, &[]).await;

    let token = app.token_for(Uuid::new_v4(), &[]);
    let mut address = address_json();
    address["country_code"] = json!("ZZ");

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/checkout/cod",
            Some(&token),
            Some(json!({
                "items": [line_json(&product, 1)],
                "shipping_method": "standard",
                "shipping_address": address,
                "customer_email": "cod@example.com",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.product_stock(product.id).await, 5);
}
