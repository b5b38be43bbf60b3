use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub report: ReportConfig,
}

// Настройки приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: String,
    pub site_url: String,
}

/// Где хранить данные: Postgres в проде, память для локальной разработки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

// Настройки базы данных
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis (кеш схем форм). Без URL кеш отключен.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub form_ttl_seconds: u64,
}

// Настройки JWT и хеширования паролей
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
    pub bcrypt_cost: u32,
}

// Настройки почтового API (совместимого с Resend)
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub support_to: String,
    pub timeout_seconds: u64,
}

// Настройки отчетов: локальная граница дня для дашборда и CSV
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub utc_offset_minutes: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

fn var_or(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(key, default);
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = var_or("ENVIRONMENT", "development");
        let backend = match var_or("STORAGE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) if backend == StorageBackend::Memory => String::new(),
            Err(_) => return Err(ConfigError::Missing("DATABASE_URL")),
        };

        // В проде секрет обязателен, в разработке подставляем заглушку
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment != "production" => "dev-secret-change-me".to_string(),
            Err(_) => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_or("PORT", "8000")?,
                environment,
                rust_log: var_or("RUST_LOG", "event_forms=debug,tower_http=debug"),
                log_format: var_or("LOG_FORMAT", "pretty"),
                site_url: var_or("SITE_URL", "http://localhost:3000"),
            },
            database: DatabaseConfig {
                backend,
                url: database_url,
                pool_size: parse_or("DB_POOL_SIZE", "20")?,
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
                form_ttl_seconds: parse_or("FORM_CACHE_TTL_SECONDS", "3600")?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in_hours: parse_or("JWT_EXPIRES_IN_HOURS", "24")?,
                bcrypt_cost: parse_or("BCRYPT_COST", "12")?,
            },
            email: EmailConfig {
                api_url: var_or("EMAIL_API_URL", "https://api.resend.com"),
                api_key: env::var("RESEND_API_KEY").ok().filter(|key| !key.is_empty()),
                from: var_or("EMAIL_FROM", "EventForm+ <onboarding@resend.dev>"),
                support_to: var_or("SUPPORT_EMAIL_TO", "support@localhost"),
                timeout_seconds: parse_or("EMAIL_TIMEOUT_SECONDS", "10")?,
            },
            report: ReportConfig {
                utc_offset_minutes: parse_or("REPORT_UTC_OFFSET_MINUTES", "0")?,
            },
        })
    }

    /// Смещение локального времени для отчетов. Некорректное значение трактуем как UTC.
    pub fn report_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.report.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Config {
    /// Конфигурация для локального запуска и тестов: хранилище в памяти, без Redis и почты.
    pub fn development() -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                environment: "development".to_string(),
                rust_log: "event_forms=debug,tower_http=debug".to_string(),
                log_format: "pretty".to_string(),
                site_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: String::new(),
                pool_size: 5,
            },
            redis: RedisConfig {
                url: None,
                form_ttl_seconds: 3600,
            },
            jwt: JwtConfig {
                secret: "dev-secret-change-me".to_string(),
                expires_in_hours: 24,
                bcrypt_cost: 4,
            },
            email: EmailConfig {
                api_url: "http://127.0.0.1:9".to_string(),
                api_key: None,
                from: "EventForm+ <onboarding@resend.dev>".to_string(),
                support_to: "support@localhost".to_string(),
                timeout_seconds: 5,
            },
            report: ReportConfig {
                utc_offset_minutes: 0,
            },
        }
    }
}
