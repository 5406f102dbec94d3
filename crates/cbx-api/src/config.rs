use serde::Deserialize;
use thiserror::Error;

/// Deployment environment the API runs in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),
    #[error("JWT_SECRET must be at least 32 bytes")]
    JwtSecretTooShort,
    #[error("COOKIE_SECRET must be at least 64 bytes")]
    CookieSecretTooShort,
    #[error("DEFAULT_BOX_AMOUNT must be between 1 and 13, got {0}")]
    DefaultBoxAmount(i32),
}

/// Runtime configuration, read from upper-case environment variables
/// (`DATABASE_URL`, `JWT_SECRET`, ...)
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub cookie_secret: String,
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of origins allowed by CORS
    #[serde(default)]
    pub allowed_origins: String,
    #[serde(default = "default_jwt_expiry_hours")]
    pub jwt_expiry_hours: i64,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_box_amount")]
    pub default_box_amount: i32,
    /// Comma-separated emails that receive the admin role on registration
    #[serde(default)]
    pub admin_emails: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_jwt_expiry_hours() -> i64 {
    24
}

const fn default_db_max_connections() -> u32 {
    10
}

const fn default_bcrypt_cost() -> u32 {
    12
}

const fn default_box_amount() -> i32 {
    cbx_srs::MAX_BOX
}

impl ApiConfig {
    /// Load and validate configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < 32 {
            return Err(ConfigError::JwtSecretTooShort);
        }
        if self.cookie_secret.len() < 64 {
            return Err(ConfigError::CookieSecretTooShort);
        }
        cbx_srs::validate_box_amount(self.default_box_amount)
            .map_err(|_| ConfigError::DefaultBoxAmount(self.default_box_amount))?;
        Ok(())
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        split_list(&self.allowed_origins)
    }

    /// Admin emails, lower-cased for comparison
    pub fn parsed_admin_emails(&self) -> Vec<String> {
        split_list(&self.admin_emails)
            .into_iter()
            .map(|email| email.to_lowercase())
            .collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
