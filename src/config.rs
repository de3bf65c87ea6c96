use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub promo: PromoConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frontend origins allowed by CORS; empty allows any
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// REST root, e.g. `https://pay.example.com/payment/rest`
    pub base_url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_locale")]
    pub language: String,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    pub return_url: String,
    pub callback_url: String,
    pub description_prefix: String,
    /// Days between two installments of a plan
    pub installment_interval_days: i64,
    pub default_locale: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            return_url: "http://localhost:3000/dashboard".to_string(),
            callback_url: "http://localhost:8080/api/payment/callback".to_string(),
            description_prefix: "Conference registration".to_string(),
            installment_interval_days: 30,
            default_locale: default_locale(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoConfig {
    pub reservation_ttl_secs: i64,
    /// Upper bound between two expiry re-checks of an armed reservation
    pub watchdog_interval_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for PromoConfig {
    fn default() -> Self {
        Self {
            reservation_ttl_secs: 900,
            watchdog_interval_secs: 10,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub availability_cache_ttl_secs: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            availability_cache_ttl_secs: 5,
        }
    }
}

/// Reference data inserted at startup when missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub rooms: Vec<RoomSeed>,
    #[serde(default = "default_plans")]
    pub plans: Vec<PlanSeed>,
    #[serde(default)]
    pub promo_codes: Vec<PromoSeed>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            rooms: Vec::new(),
            plans: default_plans(),
            promo_codes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSeed {
    pub id: i64,
    pub name: String,
    pub guests: i32,
    pub price_cents: i64,
    pub available: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSeed {
    pub id: i64,
    pub installments: i32,
    pub schedule: String,
    #[serde(default)]
    pub cutoff_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub savings: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoSeed {
    pub code: String,
    pub discount_bp: i32,
    #[serde(default)]
    pub room_type_id: Option<i64>,
    #[serde(default)]
    pub active_from: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "840".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_gateway_timeout() -> u64 {
    15
}

fn default_plans() -> Vec<PlanSeed> {
    let plan = |id: i64, schedule: &str, savings: Option<&str>| PlanSeed {
        id,
        installments: id as i32,
        schedule: schedule.to_string(),
        cutoff_at: None,
        popular: false,
        savings: savings.map(str::to_string),
    };
    vec![
        plan(1, "Pay in full today", Some("Best Value")),
        plan(2, "Half today, half in 30 days", None),
        plan(3, "Three payments every 30 days", None),
        plan(4, "Four payments every 30 days", Some("Most Flexible")),
    ]
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            // No file: build everything from the environment
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;
                let gateway_base_url = get_env("GATEWAY_BASE_URL")
                    .ok_or("GATEWAY_BASE_URL is not set and no config.toml was found")?;

                let checkout_defaults = CheckoutConfig::default();
                let promo_defaults = PromoConfig::default();

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        allowed_origins: get_env("SERVER_ALLOWED_ORIGINS")
                            .map(|v| v.split(',').map(|o| o.trim().to_string()).collect())
                            .unwrap_or_default(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    gateway: GatewayConfig {
                        base_url: gateway_base_url,
                        username: get_env("GATEWAY_USERNAME").unwrap_or_default(),
                        password: get_env("GATEWAY_PASSWORD").unwrap_or_default(),
                        currency: get_env("GATEWAY_CURRENCY").unwrap_or_else(default_currency),
                        language: get_env("GATEWAY_LANGUAGE").unwrap_or_else(default_locale),
                        timeout_secs: get_env_parse(
                            "GATEWAY_TIMEOUT_SECS",
                            default_gateway_timeout(),
                        ),
                    },
                    checkout: CheckoutConfig {
                        return_url: get_env("CHECKOUT_RETURN_URL")
                            .unwrap_or(checkout_defaults.return_url),
                        callback_url: get_env("CHECKOUT_CALLBACK_URL")
                            .unwrap_or(checkout_defaults.callback_url),
                        description_prefix: get_env("CHECKOUT_DESCRIPTION_PREFIX")
                            .unwrap_or(checkout_defaults.description_prefix),
                        installment_interval_days: get_env_parse(
                            "CHECKOUT_INSTALLMENT_INTERVAL_DAYS",
                            checkout_defaults.installment_interval_days,
                        ),
                        default_locale: get_env("CHECKOUT_DEFAULT_LOCALE")
                            .unwrap_or(checkout_defaults.default_locale),
                    },
                    promo: PromoConfig {
                        reservation_ttl_secs: get_env_parse(
                            "PROMO_RESERVATION_TTL_SECS",
                            promo_defaults.reservation_ttl_secs,
                        ),
                        watchdog_interval_secs: get_env_parse(
                            "PROMO_WATCHDOG_INTERVAL_SECS",
                            promo_defaults.watchdog_interval_secs,
                        ),
                        sweep_interval_secs: get_env_parse(
                            "PROMO_SWEEP_INTERVAL_SECS",
                            promo_defaults.sweep_interval_secs,
                        ),
                    },
                    inventory: InventoryConfig {
                        availability_cache_ttl_secs: get_env_parse(
                            "INVENTORY_CACHE_TTL_SECS",
                            InventoryConfig::default().availability_cache_ttl_secs,
                        ),
                    },
                    catalog: CatalogConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment variables win even when a file exists
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("GATEWAY_BASE_URL") {
            config.gateway.base_url = v;
        }
        if let Ok(v) = env::var("GATEWAY_USERNAME") {
            config.gateway.username = v;
        }
        if let Ok(v) = env::var("GATEWAY_PASSWORD") {
            config.gateway.password = v;
        }
        if let Ok(v) = env::var("CHECKOUT_RETURN_URL") {
            config.checkout.return_url = v;
        }
        if let Ok(v) = env::var("CHECKOUT_CALLBACK_URL") {
            config.checkout.callback_url = v;
        }
        if let Ok(v) = env::var("PROMO_RESERVATION_TTL_SECS")
            && let Ok(n) = v.parse()
        {
            config.promo.reservation_ttl_secs = n;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.promo.reservation_ttl_secs <= 0 {
            return Err("promo.reservation_ttl_secs must be positive".to_string());
        }
        if self.promo.watchdog_interval_secs == 0 || self.promo.sweep_interval_secs == 0 {
            return Err("promo intervals must be positive".to_string());
        }
        if self.checkout.installment_interval_days <= 0 {
            return Err("checkout.installment_interval_days must be positive".to_string());
        }
        for plan in &self.catalog.plans {
            if plan.installments < 1 {
                return Err(format!("plan {} must have at least one installment", plan.id));
            }
        }
        for promo in &self.catalog.promo_codes {
            if !(0..10_000).contains(&promo.discount_bp) {
                return Err(format!("promo code {} discount_bp out of range", promo.code));
            }
        }
        Ok(())
    }
}
