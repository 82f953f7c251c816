use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Payment gateway connection settings.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Base URL of the gateway REST API
    pub api_url: String,
    /// Secret API key sent as a bearer token
    pub secret_key: String,
    /// Shared secret for webhook signature verification. Required: the
    /// webhook route carries no other authentication.
    #[validate(length(min = 1))]
    pub webhook_secret: String,
    /// Accepted clock skew for signed webhook timestamps
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: u64,
    /// Where the hosted payment page redirects after success
    pub success_url: String,
    /// Where the hosted payment page redirects after cancel
    pub cancel_url: String,
}

fn default_webhook_tolerance() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

/// Transactional email + newsletter API settings.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    /// Sender address for transactional mail
    #[validate(email)]
    pub from_address: String,
    /// Operator inbox for new-order alerts
    #[validate(email)]
    pub admin_address: String,
    pub newsletter_api_url: String,
    pub newsletter_api_key: String,
}

/// Application configuration, loaded from `config/` files plus `APP__`
/// prefixed environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT signing secret (HS256)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool sizing
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[validate]
    pub gateway: GatewayConfig,
    #[validate]
    pub email: EmailConfig,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("test")
    }

    /// Minimal constructor used by tests.
    pub fn for_tests(database_url: String, jwt_secret: String) -> Self {
        Self {
            database_url,
            jwt_secret,
            host: "127.0.0.1".to_string(),
            port: 18_080,
            environment: "test".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
            db_max_connections: 1,
            db_min_connections: 1,
            db_connect_timeout_secs: 5,
            gateway: GatewayConfig {
                api_url: "http://127.0.0.1:0".to_string(),
                secret_key: "sk_test".to_string(),
                webhook_secret: "whsec_test".to_string(),
                webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
                success_url: "http://localhost/checkout/success".to_string(),
                cancel_url: "http://localhost/checkout/cancel".to_string(),
            },
            email: EmailConfig {
                api_url: "http://127.0.0.1:0".to_string(),
                api_key: "em_test".to_string(),
                from_address: "orders@example.com".to_string(),
                admin_address: "admin@example.com".to_string(),
                newsletter_api_url: "http://127.0.0.1:0".to_string(),
                newsletter_api_key: "nl_test".to_string(),
            },
        }
    }
}

/// Load configuration from files and environment.
///
/// Precedence (lowest to highest): `config/default`, `config/{environment}`,
/// `APP__*` environment variables (`__` as the nesting separator).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment =
        std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{environment}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    Ok(cfg)
}

/// Initialise the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
