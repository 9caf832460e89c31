use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::{Result, Timestamp};

/// Clock used to derive the `api-nonce` of a request.
///
/// `SystemClock` reads local wall-clock time at signing. `Fixed` pins the reading, which makes
/// signatures reproducible.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NoncePolicy {
    #[default]
    SystemClock,
    Fixed(Timestamp),
}

impl NoncePolicy {
    pub(crate) fn now(self) -> Result<DateTime<Utc>> {
        match self {
            NoncePolicy::SystemClock => Ok(Utc::now()),
            NoncePolicy::Fixed(ts) => DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| Error::validation(format!("timestamp {ts} is out of range"))),
        }
    }
}
