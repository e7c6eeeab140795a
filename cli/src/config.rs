use std::{fs, path::Path, time::Duration};

use chrono::{NaiveTime, TimeDelta};
use chrono_tz::Tz;
use prices::{Domain, PublicationRule, Tariff, cache::DEFAULT_MAX_TOMORROW_ATTEMPTS};
use serde::{Deserialize, Deserializer};

use crate::prelude::*;

#[derive(Deserialize)]
pub struct Config {
    pub tariff: Tariff,
    pub market: MarketConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl Config {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        info!("reading the configuration…");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("invalid configuration in `{}`", path.display()))
    }
}

#[derive(Deserialize)]
pub struct MarketConfig {
    /// Bidding zone, used for both `in_Domain` and `out_Domain`.
    pub domain: Domain,

    /// Zone which defines the delivery days.
    pub timezone: Tz,

    #[serde(
        default = "MarketConfig::default_publication_time",
        deserialize_with = "deserialize_time"
    )]
    pub publication_time: NaiveTime,

    #[serde(default = "MarketConfig::default_publication_timezone")]
    pub publication_timezone: Tz,
}

impl MarketConfig {
    fn default_publication_time() -> NaiveTime {
        PublicationRule::default().time
    }

    fn default_publication_timezone() -> Tz {
        PublicationRule::default().timezone
    }

    pub const fn publication(&self) -> PublicationRule {
        PublicationRule { time: self.publication_time, timezone: self.publication_timezone }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub max_tomorrow_attempts: u32,

    /// Minutes between the refreshes in the `watch` mode.
    pub interval: u64,

    /// Length of the cheapest and the most expensive windows.
    pub cheapest_hours: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_tomorrow_attempts: DEFAULT_MAX_TOMORROW_ATTEMPTS,
            interval: 15,
            cheapest_hours: 3,
        }
    }
}

impl RefreshConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval * 60)
    }

    pub fn window_length(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.cheapest_hours))
    }
}

/// Accepts both `12:45` and `12:45:00`.
fn deserialize_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let text = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M"))
        .map_err(serde::de::Error::custom)
}
