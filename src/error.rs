use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;

/// Broad category of an [`Error`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// The exchange answered with a recognized error status, see [`ApiFailure`].
    Api,
    /// Caller supplied input that cannot be signed or sent.
    Validation,
    /// Network or HTTP client failure raised by the transport.
    Transport,
    /// A response body could not be decoded.
    Json,
    /// Configuration could not be loaded from the environment.
    Configuration,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    /// The typed exchange failure, when this error came out of response diagnosis.
    #[must_use]
    pub fn api_failure(&self) -> Option<&ApiFailure> {
        self.downcast_ref::<ApiFailure>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Configuration {
            reason: message.into(),
        }
        .into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

/// Settings that are missing or unparsable.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Configuration {
    pub reason: String,
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for Configuration {}

impl From<Configuration> for Error {
    fn from(err: Configuration) -> Self {
        Error::with_source(Kind::Configuration, err)
    }
}

/// Terminal failure reported by the exchange. None of these are retried by this crate.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiFailure {
    /// `503`: the matching engine is shedding load.
    MarketOverloaded(String),
    /// `429`: the account's request budget is exhausted.
    RetryLimitExceeded(String),
    /// `400`: the request was rejected as malformed.
    BadParameters(String),
    /// `401`: credentials or signature were rejected.
    Unauthorized(String),
}

impl ApiFailure {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ApiFailure::MarketOverloaded(message)
            | ApiFailure::RetryLimitExceeded(message)
            | ApiFailure::BadParameters(message)
            | ApiFailure::Unauthorized(message) => message,
        }
    }

    /// Status code that produces this failure.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            ApiFailure::MarketOverloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiFailure::RetryLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiFailure::BadParameters(_) => StatusCode::BAD_REQUEST,
            ApiFailure::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiFailure::MarketOverloaded(_) => "market overloaded",
            ApiFailure::RetryLimitExceeded(_) => "retry limit exceeded",
            ApiFailure::BadParameters(_) => "bad parameters",
            ApiFailure::Unauthorized(_) => "unauthorized",
        };
        write!(f, "{label} ({}): {}", self.status_code(), self.message())
    }
}

impl StdError for ApiFailure {}

impl From<ApiFailure> for Error {
    fn from(err: ApiFailure) -> Self {
        Error::with_source(Kind::Api, err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::with_source(Kind::Transport, err)
    }
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(Kind::Json, err)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_failure_round_trips_through_error() {
        let err: Error = ApiFailure::BadParameters("bad param".to_owned()).into();

        assert_eq!(err.kind(), Kind::Api);
        assert_eq!(
            err.api_failure(),
            Some(&ApiFailure::BadParameters("bad param".to_owned()))
        );
    }

    #[test]
    fn display_includes_status_and_message() {
        let failure = ApiFailure::MarketOverloaded("overloaded".to_owned());

        assert_eq!(
            failure.to_string(),
            "market overloaded (503 Service Unavailable): overloaded"
        );
        assert_eq!(
            Error::from(failure).to_string(),
            "Api: market overloaded (503 Service Unavailable): overloaded"
        );
    }

    #[test]
    fn validation_error_has_no_api_failure() {
        let err = Error::validation("empty key");

        assert_eq!(err.kind(), Kind::Validation);
        assert!(err.api_failure().is_none(), "validation is not an api failure");
        assert_eq!(
            err.downcast_ref::<Validation>().map(|v| v.reason.as_str()),
            Some("empty key")
        );
    }

    #[test]
    fn configuration_error_kind() {
        let err = Error::configuration("BITMEX_API_KEY is not set");

        assert_eq!(err.kind(), Kind::Configuration);
        assert_eq!(err.to_string(), "Configuration: BITMEX_API_KEY is not set");
        assert!(err.downcast_ref::<Validation>().is_none(), "not a validation payload");
        assert_eq!(
            err.downcast_ref::<Configuration>().map(|c| c.reason.as_str()),
            Some("BITMEX_API_KEY is not set")
        );
    }
}
