use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

use crate::gateway::{GatewayEnvironment, GatewaySettings};
use crate::services::checkout_service::DEFAULT_TAX_RATE_BPS;

const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub psp_api_key: String,
    pub psp_client_key: String,
    pub psp_merchant_account: String,
    pub psp_environment: String,
    pub psp_api_url: String,
    pub public_base_url: String,
    pub tax_rate_bps: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).with_context(|| format!("{} is required", key));

        let server_port = match get("SERVER_PORT") {
            Some(port) => port.parse().context("SERVER_PORT must be a valid port")?,
            None => DEFAULT_SERVER_PORT,
        };

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => postgres_url_from_parts(&get)?,
        };

        let psp_environment = get("PSP_ENVIRONMENT").unwrap_or_else(|| "TEST".to_string());
        let psp_api_url = get("PSP_API_URL").unwrap_or_else(|| {
            GatewayEnvironment::parse(&psp_environment)
                .base_url()
                .to_string()
        });

        let tax_rate_bps = match get("TAX_RATE_BPS") {
            Some(rate) => rate
                .parse()
                .context("TAX_RATE_BPS must be a non-negative integer")?,
            None => DEFAULT_TAX_RATE_BPS,
        };

        Ok(Config {
            server_port,
            database_url,
            psp_api_key: require("PSP_API_KEY")?,
            psp_client_key: require("PSP_CLIENT_KEY")?,
            psp_merchant_account: require("PSP_MERCHANT_ACCOUNT")?,
            psp_environment,
            psp_api_url,
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            tax_rate_bps,
        })
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            base_url: self.psp_api_url.clone(),
            api_key: self.psp_api_key.clone(),
            merchant_account: self.psp_merchant_account.clone(),
        }
    }

    /// Where the hosted checkout sends the shopper back to.
    pub fn return_url(&self) -> String {
        format!(
            "{}/order/confirmation",
            self.public_base_url.trim_end_matches('/')
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            bail!("SERVER_PORT must be greater than 0");
        }
        url::Url::parse(&self.database_url).context("DATABASE_URL is not a valid URL")?;
        url::Url::parse(&self.psp_api_url).context("PSP_API_URL is not a valid URL")?;
        url::Url::parse(&self.public_base_url).context("PUBLIC_BASE_URL is not a valid URL")?;
        Ok(())
    }
}

fn postgres_url_from_parts<F>(get: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let part = |key: &str| {
        get(key).with_context(|| format!("DATABASE_URL or {} is required", key))
    };

    Ok(format!(
        "postgres://{}:{}@{}/{}",
        part("POSTGRES_USER")?,
        part("POSTGRES_PASSWORD")?,
        part("POSTGRES_HOSTNAME")?,
        part("POSTGRES_DB")?,
    ))
}

/// Hides the password component of a connection URL.
pub fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

/// Shows only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", visible)
}
