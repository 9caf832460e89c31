#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod auth;
pub mod connector;
pub mod diagnosis;
pub mod error;
pub mod position;
pub mod transport;

pub use connector::{Config, Connector, NoncePolicy, RawConfig};
pub use diagnosis::{ApiResponse, RateLimitState, diagnose};
pub use error::{ApiFailure, Error, Kind};
pub use transport::Transport;

pub type Result<T> = std::result::Result<T, Error>;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

/// Production REST root.
pub const MAINNET_URL: &str = "https://www.bitmex.com/api/v1/";
/// Testnet REST root.
pub const TESTNET_URL: &str = "https://testnet.bitmex.com/api/v1/";
