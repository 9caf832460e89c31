//! Response diagnosis: rate-limit bookkeeping and status code dispatch.

use std::str::FromStr;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Result;
use crate::error::ApiFailure;

pub const RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Rate-limit counters as last reported by the exchange. `None` means unknown.
///
/// Nothing here is enforced; callers read it to pace themselves.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RateLimitState {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_seconds: Option<u64>,
}

impl RateLimitState {
    pub const UNKNOWN: Self = Self {
        limit: None,
        remaining: None,
        reset_seconds: None,
    };

    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header(headers, RATELIMIT_LIMIT),
            remaining: header(headers, RATELIMIT_REMAINING),
            reset_seconds: header(headers, RATELIMIT_RESET),
        }
    }

    /// Replaces every counter with what `headers` report. Absent headers reset to unknown.
    pub fn update(&mut self, headers: &HeaderMap) {
        *self = Self::from_headers(headers);
    }
}

fn header<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// A fully read HTTP response.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    #[must_use]
    pub fn new<B: Into<Vec<u8>>>(status: StatusCode, headers: HeaderMap, body: B) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Drains a blocking reqwest response.
    pub fn read(response: reqwest::blocking::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();

        Ok(Self::new(status, headers, body))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Updates `rate_limit` from `response` and maps recognized error statuses to [`ApiFailure`].
///
/// Any other status yields the parsed JSON body. An empty body parses to [`Value::Null`].
pub fn diagnose(response: &ApiResponse, rate_limit: &mut RateLimitState) -> Result<Value> {
    rate_limit.update(&response.headers);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        status = %response.status,
        limit = ?rate_limit.limit,
        remaining = ?rate_limit.remaining,
        reset_seconds = ?rate_limit.reset_seconds,
        "diagnosed API response"
    );

    let failure = match response.status {
        StatusCode::SERVICE_UNAVAILABLE => ApiFailure::MarketOverloaded(error_message(response)),
        StatusCode::TOO_MANY_REQUESTS => {
            ApiFailure::RetryLimitExceeded(reset_message(rate_limit.reset_seconds))
        }
        StatusCode::BAD_REQUEST => ApiFailure::BadParameters(error_message(response)),
        StatusCode::UNAUTHORIZED => ApiFailure::Unauthorized(error_message(response)),
        _ => return parse_body(&response.body),
    };

    Err(failure.into())
}

fn parse_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(body)?)
}

/// `error.message` from the body, else the raw body, else the canonical reason.
fn error_message(response: &ApiResponse) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorResponse>(&response.body) {
        return parsed.error.message;
    }

    let raw = String::from_utf8_lossy(&response.body);
    let raw = raw.trim();
    if !raw.is_empty() {
        return raw.to_owned();
    }

    response
        .status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_owned()
}

fn reset_message(reset_seconds: Option<u64>) -> String {
    match reset_seconds {
        Some(seconds) => format!("Resets in {seconds} seconds"),
        None => "Resets in unknown seconds".to_owned(),
    }
}
