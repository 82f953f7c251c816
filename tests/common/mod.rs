#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    auth::{self, Claims},
    config::AppConfig,
    db,
    email::{EmailError, EmailMessage, EmailSender, NewsletterClient, NewsletterError},
    entities::{country, product, product::CountrySet},
    errors::ServiceError,
    events::EventSender,
    gateway::{sign_payload, HostedSession, HostedSessionRequest, PaymentGateway},
    handlers::AppServices,
    AppState,
};

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Gateway double: records session requests, answers with a canned session,
/// and can be flipped into failure mode.
pub struct FakeGateway {
    pub requests: Mutex<Vec<HostedSessionRequest>>,
    pub fail: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn session_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_hosted_session(
        &self,
        request: HostedSessionRequest,
    ) -> Result<HostedSession, ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError(
                "gateway unavailable".to_string(),
            ));
        }
        let session_id = format!("cs_{}", request.order_id.simple());
        self.requests.lock().unwrap().push(request);
        Ok(HostedSession {
            url: format!("https://gateway.test/pay/{session_id}"),
            session_id,
        })
    }
}

/// Email double: records every message, optionally failing each send.
pub struct RecordingEmailSender {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::Api("550 rejected".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Newsletter double returning a scripted outcome.
pub struct FakeNewsletter {
    pub outcome: Mutex<Option<NewsletterError>>,
    pub subscribed: Mutex<Vec<String>>,
}

impl FakeNewsletter {
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            subscribed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_outcome(&self, outcome: NewsletterError) {
        *self.outcome.lock().unwrap() = Some(outcome);
    }
}

#[async_trait]
impl NewsletterClient for FakeNewsletter {
    async fn subscribe(&self, email: &str, _name: Option<&str>) -> Result<(), NewsletterError> {
        if let Some(outcome) = self.outcome.lock().unwrap().take() {
            return Err(outcome);
        }
        self.subscribed.lock().unwrap().push(email.to_string());
        Ok(())
    }
}

/// Full application wired against a temporary SQLite database.
pub struct TestApp {
    pub router: Router,
    pub db: Arc<DatabaseConnection>,
    pub gateway: Arc<FakeGateway>,
    pub emails: Arc<RecordingEmailSender>,
    pub newsletter: Arc<FakeNewsletter>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.db");
        // One pooled connection: SQLite files do not tolerate concurrent writers.
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let config = AppConfig::for_tests(url, JWT_SECRET.to_string());

        let pool = db::establish_connection(&config).await.expect("connect");
        db::run_migrations(&pool).await.expect("migrations");
        let db = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(storefront_api::events::process_events(event_rx));

        let gateway = Arc::new(FakeGateway::new());
        let emails = Arc::new(RecordingEmailSender::new());
        let newsletter = Arc::new(FakeNewsletter::new());

        let services = AppServices::new(
            db.clone(),
            event_sender.clone(),
            gateway.clone(),
            emails.clone(),
            newsletter.clone(),
            &config,
        );

        let state = AppState {
            db: db.clone(),
            config: Arc::new(config),
            event_sender,
            services,
        };

        Self {
            router: storefront_api::build_router(state),
            db,
            gateway,
            emails,
            newsletter,
            _dir: dir,
        }
    }

    pub fn token_for(&self, user_id: Uuid, roles: &[&str]) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: Some("customer@example.com".to_string()),
            name: Some("Test Customer".to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: now,
            exp: now + 3600,
        };
        auth::issue_token(&claims, JWT_SECRET).expect("token")
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    /// Deliver a signed webhook event.
    pub async fn deliver_webhook(&self, event: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let payload = event.to_string();
        let ts = Utc::now().timestamp().to_string();
        let signature = sign_payload(&ts, &payload.clone().into(), WEBHOOK_SECRET);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/payments/webhook")
            .header("content-type", "application/json")
            .header("x-timestamp", &ts)
            .header("x-signature", &signature)
            .body(Body::from(payload))
            .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn seed_country(&self, code: &str, currency: &str, shipping: Decimal, tax: Decimal) {
        country::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(code.to_string()),
            currency: Set(currency.to_string()),
            shipping_flat_rate: Set(shipping),
            tax_rate: Set(tax),
        }
        .insert(&*self.db)
        .await
        .expect("seed country");
    }

    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        stock: i32,
        countries: &[&str],
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            currency: Set("USD".to_string()),
            stock: Set(stock),
            category_id: Set(None),
            image_url: Set(None),
            country_availability: Set(CountrySet(
                countries.iter().map(|c| c.to_string()).collect(),
            )),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .expect("seed product")
    }

    pub async fn product_stock(&self, id: Uuid) -> i32 {
        use sea_orm::EntityTrait;
        storefront_api::entities::Product::find_by_id(id)
            .one(&*self.db)
            .await
            .expect("query")
            .expect("product")
            .stock
    }
}

/// Cart line JSON for request bodies.
pub fn line_json(product: &product::Model, quantity: i32) -> serde_json::Value {
    serde_json::json!({
        "product_id": product.id,
        "quantity": quantity,
        "unit_price": product.price,
        "name": product.name,
    })
}

pub fn address_json() -> serde_json::Value {
    serde_json::json!({
        "full_name": "Test Customer",
        "line1": "1 Main St",
        "city": "Springfield",
        "postal_code": "12345",
        "country_code": "US",
    })
}
