mod common;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

use common::{address_json, line_json, TestApp};
use storefront_api::entities::{payment, Payment};

async fn create_order(app: &TestApp, token: &str, items: Vec<serde_json::Value>) -> Uuid {
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/orders",
            Some(token),
            Some(json!({
                "items": items,
                "shipping_method": "standard",
                "shipping_address": address_json(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "order creation failed: {body}");
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn checkout_session_returns_hosted_url() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    let product = app.seed_product("Widget", dec!(10.00), 5, &[]).await;

    let user_id = Uuid::new_v4();
    let token = app.token_for(user_id, &[]);
    let order_id = create_order(&app, &token, vec![line_json(&product, 2)]).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/checkout/sessions",
            Some(&token),
            Some(json!({
                "order_id": order_id,
                "items": [line_json(&product, 2)],
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "unexpected response: {body}");
    assert!(body["url"].as_str().unwrap().starts_with("https://gateway.test/pay/"));

    // The gateway was asked for a session correlated to the order.
    assert_eq!(app.gateway.session_count(), 1);
    let requests = app.gateway.requests.lock().unwrap();
    assert_eq!(requests[0].order_id, order_id);
    // 2 x 10.00 + 5.00 shipping + 10% tax on the subtotal.
    assert_eq!(requests[0].amount, dec!(27.00));
    drop(requests);

    // A pending card payment exists with no transaction id yet.
    let payments = Payment::find()
        .filter(payment::Column::OrderId.eq(order_id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, "pending");
    assert_eq!(payments[0].method, "card");
    assert_eq!(payments[0].transaction_id, None);

    // Stock is only reserved at payment confirmation.
    assert_eq!(app.product_stock(product.id).await, 5);
}

#[tokio::test]
async fn checkout_session_requires_a_token() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/checkout/sessions",
            None,
            Some(json!({ "order_id": Uuid::new_v4(), "items": [] })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_session_rejects_an_empty_cart() {
    let app = TestApp::spawn().await;
    let token = app.token_for(Uuid::new_v4(), &[]);

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/checkout/sessions",
            Some(&token),
            Some(json!({ "order_id": Uuid::new_v4(), "items": [] })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_session_reports_itemized_shortages() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    let scarce = app.seed_product("Scarce", dec!(10.00), 1, &[]).await;

    let token = app.token_for(Uuid::new_v4(), &[]);
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/checkout/sessions",
            Some(&token),
            Some(json!({
                "order_id": Uuid::new_v4(),
                "items": [line_json(&scarce, 3)],
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {body}");
    let details = body["details"].as_array().expect("shortage details");
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["requested"], 3);
    assert_eq!(details[0]["available"], 1);
    assert_eq!(app.gateway.session_count(), 0);
}

#[tokio::test]
async fn checkout_session_for_an_unknown_order_is_404() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    let product = app.seed_product("Widget", dec!(10.00), 5, &[]).await;

    let token = app.token_for(Uuid::new_v4(), &[]);
    let (status, _) = app
        .request(
            "POST",
            "/api/v1/checkout/sessions",
            Some(&token),
            Some(json!({
                "order_id": Uuid::new_v4(),
                "items": [line_json(&product, 1)],
            })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gateway_outage_surfaces_as_bad_gateway() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    let product = app.seed_product("Widget", dec!(10.00), 5, &[]).await;

    let token = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_order(&app, &token, vec![line_json(&product, 1)]).await;

    app.gateway
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/checkout/sessions",
            Some(&token),
            Some(json!({
                "order_id": order_id,
                "items": [line_json(&product, 1)],
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn users_cannot_read_each_others_orders() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    let product = app.seed_product("Widget", dec!(10.00), 5, &[]).await;

    let owner = app.token_for(Uuid::new_v4(), &[]);
    let order_id = create_order(&app, &owner, vec![line_json(&product, 1)]).await;

    let stranger = app.token_for(Uuid::new_v4(), &[]);
    let (status, _) = app
        .request(
            "GET",
            &format!("/api/v1/orders/{order_id}"),
            Some(&stranger),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            "GET",
            &format!("/api/v1/orders/{order_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
