//! Request signing for the authenticated REST API.
//!
//! Every private call carries three headers besides `Accept`:
//! - `api-nonce`: wall-clock seconds scaled to milliseconds
//! - `api-key`: the public key identifier
//! - `api-signature`: hex HMAC-SHA256 over `verb + path[?query] + nonce + body`
//!
//! The signature is taken over the request exactly as it will be sent, so headers must be
//! attached after the body is final.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac as _};
use reqwest::blocking::Request;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret as _, SecretString};
use sha2::Sha256;
use url::Url;

use crate::Result;
use crate::error::Error;

pub const API_NONCE: HeaderName = HeaderName::from_static("api-nonce");
pub const API_KEY: HeaderName = HeaderName::from_static("api-key");
pub const API_SIGNATURE: HeaderName = HeaderName::from_static("api-signature");

const JSON: HeaderValue = HeaderValue::from_static("application/json");

/// API key pair. The secret never shows up in `Debug` output.
#[non_exhaustive]
#[derive(Clone)]
pub struct Credentials {
    key: String,
    secret: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new<K: Into<String>>(key: K, secret: SecretString) -> Self {
        Self {
            key: key.into(),
            secret,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Nonce for a clock reading: whole seconds, expressed in milliseconds.
#[must_use]
pub fn nonce(now: DateTime<Utc>) -> i64 {
    now.timestamp() * 1000
}

/// Path plus `?query` when the URL has one.
#[must_use]
pub fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    }
}

/// The exact string that gets signed.
#[must_use]
pub fn message(method: &str, path_and_query: &str, nonce: i64, body: &str) -> String {
    format!("{method}{path_and_query}{nonce}{body}")
}

/// Lowercase hex HMAC-SHA256 of [`message`] keyed by `secret`.
pub fn signature(
    secret: &SecretString,
    method: &str,
    path_and_query: &str,
    nonce: i64,
    body: &str,
) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| Error::validation(format!("invalid HMAC key: {e}")))?;
    mac.update(message(method, path_and_query, nonce, body).as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds the authentication headers for `request` without touching it.
pub fn create_headers(
    request: &Request,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<HeaderMap> {
    let nonce = nonce(now);
    let body = body_text(request)?;
    let signature = signature(
        &credentials.secret,
        request.method().as_str(),
        &path_and_query(request.url()),
        nonce,
        body,
    )?;

    let mut headers = HeaderMap::with_capacity(4);
    headers.insert(ACCEPT, JSON);
    headers.insert(API_NONCE, HeaderValue::from(nonce));
    headers.insert(API_KEY, HeaderValue::from_str(&credentials.key)?);
    headers.insert(API_SIGNATURE, HeaderValue::from_str(&signature)?);

    Ok(headers)
}

/// Attaches the authentication headers to `request`. Method, URL and body are left as is.
pub fn sign(request: &mut Request, credentials: &Credentials, now: DateTime<Utc>) -> Result<()> {
    let headers = create_headers(request, credentials, now)?;
    request.headers_mut().extend(headers);

    Ok(())
}

fn body_text(request: &Request) -> Result<&str> {
    let Some(body) = request.body() else {
        return Ok("");
    };
    let bytes = body
        .as_bytes()
        .ok_or_else(|| Error::validation("streaming request bodies cannot be signed"))?;

    Ok(std::str::from_utf8(bytes)?)
}
