use chrono::{DateTime, Utc};

use crate::{fetch::FetchError, unit::Unit};

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The series is rejected as a whole.
    #[error("invalid series: {0}")]
    InvalidSeries(String),

    #[error("cannot convert `{from}` into `{to}`")]
    UnsupportedConversion { from: Unit, to: Unit },

    #[error("no price for {0}")]
    NotFound(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Single tariff with the default (zero) price.
    #[error("the fixed price is not configured")]
    MissingPrice,
}

impl Error {
    pub(crate) fn not_found_at(instant: DateTime<Utc>) -> Self {
        Self::NotFound(instant.to_rfc3339())
    }

    /// Whether the host should flag the configuration rather than the data.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingPrice | Self::UnsupportedConversion { .. })
    }
}
