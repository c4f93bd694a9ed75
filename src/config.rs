use std::env;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use log::warn;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_DELIVERY_CHARGE: &str = "30";
const DEFAULT_PAYMENT_API_URL: &str = "https://api.razorpay.com/v1";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_IMAGE_FOLDER: &str = "grabbie/order-proofs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub key_id: String,
    pub key_secret: String,
    pub api_url: String,
    pub currency: String,
}

#[derive(Clone, Debug)]
pub struct ImageConfig {
    /// Upload endpoint of the image CDN. Proof uploads fail with a gateway
    /// error when unset.
    pub upload_url: Option<String>,
    pub upload_preset: Option<String>,
    pub folder: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_pool_size: u32,
    pub auth_token_secret: String,
    /// Used when no delivery charge has been stored in the settings table yet.
    pub default_delivery_charge: BigDecimal,
    pub payment: PaymentConfig,
    pub image: ImageConfig,
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn optional(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(var: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = optional(var).unwrap_or_else(|| default.to_string());
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: format!("'{raw}': {e}"),
    })
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_delivery_charge: BigDecimal =
            parsed("DEFAULT_DELIVERY_CHARGE", DEFAULT_DELIVERY_CHARGE)?;
        if default_delivery_charge < BigDecimal::from(0) {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_DELIVERY_CHARGE",
                reason: "must not be negative".to_string(),
            });
        }

        let payment = PaymentConfig {
            key_id: optional("PAYMENT_KEY_ID").unwrap_or_default(),
            key_secret: optional("PAYMENT_KEY_SECRET").unwrap_or_default(),
            api_url: optional("PAYMENT_API_URL").unwrap_or_else(|| DEFAULT_PAYMENT_API_URL.to_string()),
            currency: optional("PAYMENT_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        };
        if payment.key_secret.is_empty() {
            warn!("PAYMENT_KEY_SECRET is not set. Online payments will fail verification.");
        }

        let image = ImageConfig {
            upload_url: optional("IMAGE_UPLOAD_URL"),
            upload_preset: optional("IMAGE_UPLOAD_PRESET"),
            folder: optional("IMAGE_FOLDER").unwrap_or_else(|| DEFAULT_IMAGE_FOLDER.to_string()),
        };
        if image.upload_url.is_none() {
            warn!("IMAGE_UPLOAD_URL is not set. Proof uploads will be rejected.");
        }

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parsed("PORT", &DEFAULT_PORT.to_string())?,
            database_url: required("DATABASE_URL")?,
            db_pool_size: parsed("DB_POOL_SIZE", &DEFAULT_POOL_SIZE.to_string())?,
            auth_token_secret: required("AUTH_TOKEN_SECRET")?,
            default_delivery_charge,
            payment,
            image,
        })
    }
}
