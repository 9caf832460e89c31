use reqwest::Method;
use reqwest::blocking::{Client as ReqwestClient, Request};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use url::Url;

use crate::Result;
use crate::auth;
use crate::connector::Config;
use crate::diagnosis::{RateLimitState, diagnose};
use crate::error::Error;
use crate::position::{Position, PositionQuery};
use crate::transport::Transport;

/// Capability for a single request. Only [`Connector`] constructors mint one.
#[derive(Debug)]
struct RequestPermit(());

/// Signed client good for one request.
#[derive(Debug)]
pub struct Connector<T = ReqwestClient> {
    config: Config,
    transport: T,
    permit: Option<RequestPermit>,
    rate_limit: RateLimitState,
}

impl Connector<ReqwestClient> {
    /// Creates a connector backed by a blocking reqwest client.
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Self::with_transport(config, builder.build()?)
    }
}

impl<T: Transport> Connector<T> {
    /// Creates a connector that sends through `transport`.
    pub fn with_transport(config: Config, transport: T) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            transport,
            permit: Some(RequestPermit(())),
            rate_limit: RateLimitState::UNKNOWN,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn remaining_calls(&self) -> Option<u32> {
        self.rate_limit.remaining
    }

    #[must_use]
    pub fn seconds_to_reset(&self) -> Option<u64> {
        self.rate_limit.reset_seconds
    }

    #[must_use]
    pub fn rate_limit(&self) -> RateLimitState {
        self.rate_limit
    }

    /// Whether the single request has already been issued (successfully or not).
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.permit.is_none()
    }

    /// Signs, sends and diagnoses one request.
    ///
    /// `params` go into the query string for `GET`/`DELETE` and into the JSON body otherwise.
    /// Returns `Ok(None)` without any I/O once the connector is spent.
    pub fn request(
        &mut self,
        method: Method,
        endpoint: &str,
        params: &Value,
    ) -> Result<Option<Value>> {
        let Some(permit) = self.permit.take() else {
            #[cfg(feature = "tracing")]
            tracing::warn!(%method, endpoint, "connector already spent, request skipped");
            return Ok(None);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(%method, endpoint, %params, "initiating API request");

        let request = self.build_request(permit, method, endpoint, params)?;
        let response = self.transport.send(request)?;

        diagnose(&response, &mut self.rate_limit).map(Some)
    }

    /// Open positions of the account.
    pub fn positions(&mut self, query: &PositionQuery) -> Result<Option<Vec<Position>>> {
        let Some(body) = self.request(Method::GET, "position", &query.params())? else {
            return Ok(None);
        };

        Ok(Some(serde_json::from_value(body)?))
    }

    fn build_request(
        &self,
        _permit: RequestPermit,
        method: Method,
        endpoint: &str,
        params: &Value,
    ) -> Result<Request> {
        let mut url = self.config.endpoint(endpoint)?;

        let mut request = if matches!(method, Method::GET | Method::DELETE) {
            append_query(&mut url, params)?;
            Request::new(method, url)
        } else {
            let mut request = Request::new(method, url);
            if !params.is_null() {
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                *request.body_mut() = Some(serde_json::to_vec(params)?.into());
            }
            request
        };

        let now = self.config.nonce_policy.now()?;
        auth::sign(&mut request, &self.config.credentials, now)?;

        Ok(request)
    }
}

/// Scalars are sent as is; arrays and objects as compact JSON. `null` entries are dropped.
fn append_query(url: &mut Url, params: &Value) -> Result<()> {
    let fields = match params {
        Value::Null => return Ok(()),
        Value::Object(fields) => fields,
        other => {
            return Err(Error::validation(format!(
                "query parameters must be a JSON object, got {other}"
            )));
        }
    };

    let mut present = fields.iter().filter(|(_, value)| !value.is_null()).peekable();
    if present.peek().is_none() {
        return Ok(());
    }

    let mut pairs = url.query_pairs_mut();
    for (key, value) in present {
        match value {
            Value::String(text) => pairs.append_pair(key, text),
            other => pairs.append_pair(key, &other.to_string()),
        };
    }

    Ok(())
}
