use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub auth: AuthFlowConfig,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Settings for the OAuth redirect flow and token delivery.
#[derive(Debug, Clone)]
pub struct AuthFlowConfig {
    /// Secret used to sign the transient state artifact (HS256).
    pub state_secret: String,
    /// Lifetime of the state artifact cookie, in minutes.
    pub state_ttl_minutes: i64,
    /// Upper bound on the external IdP exchange, in seconds.
    pub idp_timeout_seconds: u64,
    /// Landing page a browser login is redirected to after the callback.
    pub frontend_url: String,
    /// Custom URI scheme used for mobile token delivery.
    pub mobile_scheme: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AppConfig {
            port: get_env("PORT", Some("8080"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::Config(anyhow::anyhow!(e.to_string()))
                })?,
            environment,
            service_name: get_env("SERVICE_NAME", Some("authkit"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env(
                    "DATABASE_URL",
                    Some("postgres://localhost:5432/authkit"),
                    is_prod,
                )?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            },
            auth: AuthFlowConfig {
                state_secret: get_env(
                    "STATE_SECRET",
                    Some("dev-only-state-secret-change-me"),
                    is_prod,
                )?,
                state_ttl_minutes: get_env("STATE_TTL_MINUTES", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                idp_timeout_seconds: get_env("IDP_TIMEOUT_SECONDS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                frontend_url: get_env("FRONTEND_URL", Some("http://localhost:3000"), is_prod)?,
                mobile_scheme: get_env("MOBILE_SCHEME", Some("authkit"), is_prod)?,
            },
            allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 {
            return Err(AppError::Config(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.auth.state_ttl_minutes <= 0 {
            return Err(AppError::Config(anyhow::anyhow!(
                "STATE_TTL_MINUTES must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.auth.state_secret.len() < 32 {
                return Err(AppError::Config(anyhow::anyhow!(
                    "STATE_SECRET must be at least 32 bytes in production"
                )));
            }

            if self.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::Config(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
