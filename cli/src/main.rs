#![allow(clippy::doc_markdown)]
#![doc = include_str!("../../README.md")]

mod api;
mod cli;
mod config;
mod host;
mod prelude;
mod tables;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::sleep,
    time::{Duration, Instant},
};

use chrono::{TimeDelta, Utc};
use clap::{Parser, crate_version};
use prices::{Interval, PriceCache, Status, TariffKind};

use crate::{
    api::{entsoe, heartbeat},
    cli::{Args, Command, EntsoeArgs, WatchArgs, WindowsArgs},
    config::Config,
    host::{Handler, LogReporter},
    prelude::*,
    tables::{build_prices_table, build_windows_table},
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let config = Config::read_from(&args.config)?;
    let handler = new_handler(&config, args.entsoe)?;

    match args.command {
        Command::Price => price(&handler)?,
        Command::Windows(args) => windows(&handler, &args)?,
        Command::Watch(args) => {
            let interval = match &args.interval {
                Some(interval) => **interval,
                None => config.refresh.interval(),
            };
            watch(&handler, &args, interval)?;
        }
    }

    info!("done!");
    Ok(())
}

fn new_handler(config: &Config, entsoe: EntsoeArgs) -> Result<Handler<LogReporter>> {
    let token = match (config.tariff.kind, entsoe.token) {
        (TariffKind::Spot, None) => {
            bail!("the spot tariff needs the ENTSO-E token, see `--entsoe-token`")
        }
        (_, token) => token.unwrap_or_default(),
    };
    let fetcher = entsoe::Api::new(
        entsoe.base_url,
        token,
        config.market.domain.clone(),
        config.market.timezone,
    );
    let cache = PriceCache::builder()
        .fetcher(Box::new(fetcher))
        .timezone(config.market.timezone)
        .publication(config.market.publication())
        .max_tomorrow_attempts(config.refresh.max_tomorrow_attempts)
        .build();
    Ok(Handler::builder()
        .tariff(config.tariff.clone())
        .cache(cache)
        .reporter(LogReporter)
        .window_length(config.refresh.window_length())
        .build())
}

/// Today's and tomorrow's consumer prices.
#[instrument(skip_all)]
fn price(handler: &Handler<LogReporter>) -> Result {
    let now = Utc::now();
    let status = handler.refresh(now);
    let cache = handler.cache();
    let today = cache.day_of(now);
    let tomorrow = today.succ_opt().context("the calendar is exhausted")?;
    let points = handler.tariff().effective_prices(
        cache,
        Interval::day(today, cache.timezone())?.start(),
        Interval::day(tomorrow, cache.timezone())?.end(),
    )?;
    if points.is_empty() {
        warn!(%status, "no market prices to show");
    } else {
        let table = build_prices_table(&points, &handler.tariff().target_unit, cache.timezone());
        println!("{table}");
    }
    handler.channels(now).trace();
    Ok(())
}

#[instrument(skip_all, fields(hours = ?args.hours))]
fn windows(handler: &Handler<LogReporter>, args: &WindowsArgs) -> Result {
    let tariff = handler.tariff();
    ensure!(tariff.kind == TariffKind::Spot, "the windows only make sense for the spot tariff");

    let now = Utc::now();
    handler.refresh(now);
    let (range_start, range_end) = handler.window_range(now);
    let window_length = args
        .hours
        .map_or_else(|| handler.window_length(), |hours| TimeDelta::hours(i64::from(hours)));
    let cache = handler.cache();
    let cheapest = tariff.cheapest_window(cache, range_start, range_end, window_length)?;
    let most_expensive =
        tariff.most_expensive_window(cache, range_start, range_end, window_length)?;
    println!(
        "{}",
        build_windows_table(
            &[("cheapest", cheapest), ("most expensive", most_expensive)],
            &tariff.target_unit,
            cache.timezone(),
        ),
    );
    Ok(())
}

/// Refresh loop, until `SIGTERM` or `SIGINT`.
fn watch(handler: &Handler<LogReporter>, args: &WatchArgs, interval: Duration) -> Result {
    let heartbeat = heartbeat::Client::new(args.heartbeat_url.clone());

    let should_terminate = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&should_terminate))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&should_terminate))?;

    info!(?interval, "watching…");
    while !should_terminate.load(Ordering::Relaxed) {
        let status = handler.refresh(Utc::now());
        handler.channels(Utc::now()).trace();
        if status != Status::Error {
            heartbeat.send();
        }
        sleep_unless(&should_terminate, interval);
    }
    Ok(())
}

/// Sleep in short slices to notice the termination flag.
fn sleep_unless(should_terminate: &AtomicBool, duration: Duration) {
    const SLICE: Duration = Duration::from_millis(250);

    let deadline = Instant::now() + duration;
    while !should_terminate.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        sleep(remaining.min(SLICE));
    }
}
