mod models;

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use http::StatusCode;
use prices::{DayQuotes, Domain, FetchDay, FetchError, Interval, StatusClass};
use serde::Serialize;
use ureq::Agent;

use self::models::{Acknowledgement, PublicationDocument};
use crate::prelude::*;

pub const DEFAULT_BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

/// ENTSO-E Transparency Platform client for the day-ahead prices of one bidding zone.
pub struct Api {
    client: Agent,
    base_url: String,
    security_token: String,
    domain: Domain,
    timezone: Tz,
}

impl Api {
    pub fn new(base_url: String, security_token: String, domain: Domain, timezone: Tz) -> Self {
        let client = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(10)))
            .http_status_as_error(false)
            .build()
            .into();
        Self { client, base_url, security_token, domain, timezone }
    }

    fn url(&self, day: Interval) -> Result<String, FetchError> {
        let query = Query {
            security_token: &self.security_token,
            document_type: "A44",
            in_domain: &self.domain.0,
            out_domain: &self.domain.0,
            contract_type: "A01",
            period_start: format_period(day.start()),
            period_end: format_period(day.end()),
        };
        let query = serde_qs::to_string(&query).map_err(|error| request_error(&error))?;
        Ok(format!("{}?{query}", self.base_url))
    }
}

impl FetchDay for Api {
    #[instrument(skip_all, fields(on = %on, domain = %self.domain))]
    fn fetch_day(&self, on: NaiveDate) -> Result<DayQuotes, FetchError> {
        info!("fetching…");
        let day = Interval::day(on, self.timezone).map_err(|error| request_error(&error))?;
        let mut response = self
            .client
            .get(self.url(day)?)
            .call()
            .map_err(|error| FetchError::transport(error.to_string()))?;
        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|error| FetchError::transport(error.to_string()))?;
        debug!(%status, len = body.len(), "received");
        parse_response(status, &body, &self.domain, day)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Query<'a> {
    security_token: &'a str,
    document_type: &'static str,

    #[serde(rename = "in_Domain")]
    in_domain: &'a str,

    #[serde(rename = "out_Domain")]
    out_domain: &'a str,

    #[serde(rename = "contract_MarketAgreement.type")]
    contract_type: &'static str,

    period_start: String,
    period_end: String,
}

/// `yyyyMMddHHmm` in UTC.
fn format_period(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%d%H%M").to_string()
}

/// The request could not be built, nothing was sent.
fn request_error(error: &dyn std::error::Error) -> FetchError {
    FetchError { class: StatusClass::ClientError, status: None, body: error.to_string() }
}

/// Map the response onto the quotes of the requested day.
///
/// The acknowledgement document is how the platform says «no data (yet)»,
/// its reason text is passed on under the response status.
fn parse_response(
    status: StatusCode,
    body: &str,
    domain: &Domain,
    day: Interval,
) -> Result<DayQuotes, FetchError> {
    if body.contains("Acknowledgement_MarketDocument") {
        let reason = quick_xml::de::from_str::<Acknowledgement>(body)
            .map_or_else(|_| body.to_owned(), |acknowledgement| acknowledgement.reason());
        return Err(FetchError::from_response(status, reason));
    }
    if !status.is_success() {
        return Err(FetchError::from_response(status, body));
    }

    let malformed = |error: &Error| FetchError {
        class: StatusClass::ServerError,
        status: Some(status),
        body: format!("malformed document: {error:#}"),
    };
    let document: PublicationDocument =
        quick_xml::de::from_str(body).map_err(|error| malformed(&error.into()))?;
    if document.time_series.is_empty() {
        return Err(FetchError::from_response(status, "the document contains no time series"));
    }
    let unit = document.unit().map_err(|error| malformed(&error))?;
    let points = document
        .points()
        .map_err(|error| malformed(&error))?
        .into_iter()
        .filter(|(interval, _)| day.encloses(*interval))
        .collect();
    Ok(DayQuotes { domain: domain.clone(), unit, published_at: document.created_at, points })
}
