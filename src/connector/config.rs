use std::time::Duration;

use bon::Builder;
use secrecy::{ExposeSecret as _, SecretString};
use url::Url;

use crate::auth::Credentials;
use crate::connector::policy::NoncePolicy;
use crate::error::Error;
use crate::{MAINNET_URL, Result};

pub const API_KEY_VAR: &str = "BITMEX_API_KEY";
pub const API_SECRET_VAR: &str = "BITMEX_API_SECRET";
pub const BASE_URL_VAR: &str = "BITMEX_BASE_URL";
pub const RATE_LIMIT_VAR: &str = "RATE_LIMIT_PER_MINUTE";

pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Unvalidated values as they come out of settings files or the environment.
#[derive(Clone, Debug)]
pub struct RawConfig {
    pub api_key: String,
    pub api_secret: SecretString,
    pub base_url: Option<String>,
    pub rate_limit_per_minute: Option<String>,
}

/// Everything a [`Connector`](crate::Connector) needs, passed in at construction.
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct Config {
    pub credentials: Credentials,
    /// REST root, e.g. [`MAINNET_URL`] or [`TESTNET_URL`](crate::TESTNET_URL).
    #[builder(default = mainnet())]
    pub base_url: Url,
    /// Advertised request budget. Informational only; nothing is throttled.
    #[builder(default = DEFAULT_RATE_LIMIT_PER_MINUTE)]
    pub rate_limit_per_minute: u32,
    #[builder(default)]
    pub nonce_policy: NoncePolicy,
    /// Applied to the reqwest client built by [`Connector::new`](crate::Connector::new).
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn new(credentials: Credentials, base_url: Url) -> Result<Self> {
        let config = Self::builder()
            .credentials(credentials)
            .base_url(base_url)
            .build();
        config.validate()?;

        Ok(config)
    }

    pub fn from_raw(raw: RawConfig) -> Result<Self> {
        let base_url = Url::parse(raw.base_url.as_deref().unwrap_or(MAINNET_URL))?;
        let rate_limit_per_minute = match raw.rate_limit_per_minute.as_deref() {
            Some(value) => value.trim().parse().map_err(|e| {
                Error::configuration(format!("invalid {RATE_LIMIT_VAR} `{value}`: {e}"))
            })?,
            None => DEFAULT_RATE_LIMIT_PER_MINUTE,
        };

        let config = Self::builder()
            .credentials(Credentials::new(raw.api_key, raw.api_secret))
            .base_url(base_url)
            .rate_limit_per_minute(rate_limit_per_minute)
            .build();
        config.validate()?;

        Ok(config)
    }

    /// Reads `BITMEX_API_KEY`, `BITMEX_API_SECRET`, and optionally `BITMEX_BASE_URL` and
    /// `RATE_LIMIT_PER_MINUTE` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with a caller supplied variable lookup.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| Error::configuration(format!("{name} is not set")))
        };

        Self::from_raw(RawConfig {
            api_key: required(API_KEY_VAR)?,
            api_secret: SecretString::from(required(API_SECRET_VAR)?),
            base_url: lookup(BASE_URL_VAR),
            rate_limit_per_minute: lookup(RATE_LIMIT_VAR),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.credentials.key().trim().is_empty() {
            return Err(Error::validation("api key must not be empty"));
        }
        if self.credentials.secret().expose_secret().is_empty() {
            return Err(Error::validation("api secret must not be empty"));
        }
        if self.base_url.cannot_be_a_base() || !matches!(self.base_url.scheme(), "http" | "https")
        {
            return Err(Error::validation(format!(
                "base url `{}` must be an http(s) URL",
                self.base_url
            )));
        }

        Ok(())
    }

    /// Resolves `endpoint` under the base URL, which is treated as a directory.
    pub(crate) fn endpoint(&self, endpoint: &str) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(base.join(endpoint.trim_start_matches('/'))?)
    }
}

fn mainnet() -> Url {
    Url::parse(MAINNET_URL).expect("MAINNET_URL is a valid URL")
}
