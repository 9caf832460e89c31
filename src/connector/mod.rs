//! One-shot, signed connector for the authenticated REST API.
//!
//! A [`Connector`] issues exactly one request over its lifetime:
//! - the request is built with its final JSON body or query
//! - auth headers are attached by [`crate::auth::sign`]
//! - the response is diagnosed and the rate-limit counters are kept for the caller
//!
//! Construct a fresh connector for every call. Later calls on a spent connector are no-ops.

mod client;
mod config;
mod policy;

pub use client::Connector;
pub use config::{
    API_KEY_VAR, API_SECRET_VAR, BASE_URL_VAR, Config, DEFAULT_RATE_LIMIT_PER_MINUTE,
    RATE_LIMIT_VAR, RawConfig,
};
pub use policy::NoncePolicy;
