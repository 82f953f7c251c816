mod common;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use storefront_api::email::NewsletterError;

#[tokio::test]
async fn product_management_is_admin_gated() {
    let app = TestApp::spawn().await;
    let customer = app.token_for(Uuid::new_v4(), &[]);
    let admin = app.token_for(Uuid::new_v4(), &["admin"]);

    let body = json!({
        "name": "Widget",
        "price": "10.00",
        "currency": "usd",
        "stock": 5,
    });

    let (status, _) = app
        .request("POST", "/api/v1/products", Some(&customer), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app
        .request("POST", "/api/v1/products", Some(&admin), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected: {created}");
    assert_eq!(created["currency"], "USD");
    let id = created["id"].as_str().unwrap();

    let (status, updated) = app
        .request(
            "PUT",
            &format!("/api/v1/products/{id}"),
            Some(&admin),
            Some(json!({ "price": "12.50" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], "12.50");

    let (status, _) = app
        .request("DELETE", &format!("/api/v1/products/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request("GET", &format!("/api/v1/products/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn country_filter_hides_unavailable_products() {
    let app = TestApp::spawn().await;
    app.seed_product("Everywhere", dec!(5.00), 10, &[]).await;
    app.seed_product("US only", dec!(5.00), 10, &["US"]).await;
    app.seed_product("EU only", dec!(5.00), 10, &["DE", "FR"]).await;

    let (status, body) = app
        .request("GET", "/api/v1/products?country=US", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Everywhere"));
    assert!(names.contains(&"US only"));
    assert!(!names.contains(&"EU only"));

    // Unfiltered listing shows the whole catalog.
    let (_, body) = app.request("GET", "/api/v1/products", None, None).await;
    assert_eq!(body["pagination"]["total"], 3);
}

#[tokio::test]
async fn category_slugs_are_unique() {
    let app = TestApp::spawn().await;
    let admin = app.token_for(Uuid::new_v4(), &["admin"]);

    let body = json!({ "name": "Accessories", "slug": "accessories" });
    let (status, _) = app
        .request("POST", "/api/v1/categories", Some(&admin), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request("POST", "/api/v1/categories", Some(&admin), Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn countries_are_public() {
    let app = TestApp::spawn().await;
    app.seed_country("US", "USD", dec!(5.00), dec!(0.10)).await;
    app.seed_country("DE", "EUR", dec!(4.00), dec!(0.19)).await;

    let (status, body) = app.request("GET", "/api/v1/countries", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let countries = body.as_array().unwrap();
    assert_eq!(countries.len(), 2);
    assert_eq!(countries[0]["code"], "DE");
    assert_eq!(countries[0]["currency"], "EUR");
}

#[tokio::test]
async fn reviews_require_auth_and_a_real_product() {
    let app = TestApp::spawn().await;
    let product = app.seed_product("Widget", dec!(10.00), 5, &[]).await;
    let token = app.token_for(Uuid::new_v4(), &[]);

    let review = json!({ "rating": 5, "comment": "great" });
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/products/{}/reviews", product.id),
            None,
            Some(review.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/products/{}/reviews", product.id),
            Some(&token),
            Some(review.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/products/{}/reviews", Uuid::new_v4()),
            Some(&token),
            Some(review),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Reviews show up on the product detail.
    let (_, detail) = app
        .request("GET", &format!("/api/v1/products/{}", product.id), None, None)
        .await;
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn newsletter_maps_upstream_outcomes() {
    let app = TestApp::spawn().await;

    let body = json!({ "email": "reader@example.com" });
    let (status, response) = app
        .request("POST", "/api/v1/newsletter/subscriptions", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["subscribed"], true);

    app.newsletter.set_outcome(NewsletterError::AlreadySubscribed);
    let (status, _) = app
        .request("POST", "/api/v1/newsletter/subscriptions", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.newsletter.set_outcome(NewsletterError::InvalidEmail);
    let (status, _) = app
        .request("POST", "/api/v1/newsletter/subscriptions", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.newsletter
        .set_outcome(NewsletterError::Api("boom".to_string()));
    let (status, _) = app
        .request("POST", "/api/v1/newsletter/subscriptions", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // Obviously invalid addresses are rejected before the API call.
    let (status, _) = app
        .request(
            "POST",
            "/api/v1/newsletter/subscriptions",
            None,
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
