use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, Utc};
use http::StatusCode;

use crate::{
    error::Result,
    interval::Interval,
    series::{Domain, PricePoint, TimeSeries},
    unit::Unit,
};

/// Source of day-ahead prices, typically a REST API adapter.
pub trait FetchDay: Send + Sync {
    /// Fetch the quotes for the delivery day.
    fn fetch_day(&self, on: NaiveDate) -> Result<DayQuotes, FetchError>;
}

/// Raw quotes as returned by the fetch collaborator, not validated yet.
#[derive(Clone, Debug)]
pub struct DayQuotes {
    pub domain: Domain,
    pub unit: Unit,
    pub published_at: DateTime<Utc>,
    pub points: Vec<(Interval, f64)>,
}

impl TryFrom<DayQuotes> for TimeSeries {
    type Error = crate::error::Error;

    fn try_from(quotes: DayQuotes) -> Result<Self> {
        let points = quotes
            .points
            .into_iter()
            .map(|(interval, price)| PricePoint::new(interval, price))
            .collect();
        Self::try_new(quotes.domain, quotes.unit, quotes.published_at, points)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusClass {
    /// The call went through, but the response is unusable.
    Success,

    ClientError,
    ServerError,

    /// No response at all, including timeouts.
    Transport,
}

impl From<StatusCode> for StatusClass {
    fn from(status: StatusCode) -> Self {
        if status.is_client_error() {
            Self::ClientError
        } else if status.is_server_error() {
            Self::ServerError
        } else {
            Self::Success
        }
    }
}

impl Display for StatusClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::ClientError => "client error",
            Self::ServerError => "server error",
            Self::Transport => "transport",
        })
    }
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("failed to fetch the prices ({class}): {body}")]
pub struct FetchError {
    pub class: StatusClass,
    pub status: Option<StatusCode>,

    /// Raw response body or the transport error message.
    pub body: String,
}

impl FetchError {
    pub fn from_response(status: StatusCode, body: impl Into<String>) -> Self {
        Self { class: StatusClass::from(status), status: Some(status), body: body.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self { class: StatusClass::Transport, status: None, body: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::from(StatusCode::OK), StatusClass::Success);
        assert_eq!(StatusClass::from(StatusCode::UNAUTHORIZED), StatusClass::ClientError);
        assert_eq!(StatusClass::from(StatusCode::SERVICE_UNAVAILABLE), StatusClass::ServerError);
    }

    #[test]
    fn test_display() {
        let error = FetchError::from_response(StatusCode::BAD_REQUEST, "<Reason/>");
        assert_eq!(
            error.to_string(),
            "failed to fetch the prices (client error): <Reason/>"
        );
        assert_eq!(
            FetchError::transport("timed out").to_string(),
            "failed to fetch the prices (transport): timed out"
        );
    }
}
