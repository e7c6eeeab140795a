use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use prices::{PricePoint, Unit, Window};

pub fn build_prices_table(points: &[PricePoint], unit: &Unit, timezone: Tz) -> Table {
    let median = median(points.iter().map(|point| point.price));

    let mut table = new_table();
    let price_header = format!("Price, {unit}");
    table.set_header(vec!["Date", "Start", "End", price_header.as_str()]);
    for point in points {
        let start = point.interval.start().with_timezone(&timezone);
        let end = point.interval.end().with_timezone(&timezone);
        table.add_row(vec![
            Cell::new(start.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(start.format("%H:%M")),
            Cell::new(end.format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(format!("{:.4}", point.price))
                .set_alignment(CellAlignment::Right)
                .fg(color(point.price, median)),
        ]);
    }
    table
}

pub fn build_windows_table(windows: &[(&str, Window)], unit: &Unit, timezone: Tz) -> Table {
    let mut table = new_table();
    let average_header = format!("Average, {unit}");
    table.set_header(vec!["Window", "Date", "Start", "End", average_header.as_str()]);
    for (name, window) in windows {
        let start = window.interval.start().with_timezone(&timezone);
        let end = window.interval.end().with_timezone(&timezone);
        table.add_row(vec![
            Cell::new(name),
            Cell::new(start.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(start.format("%H:%M")),
            Cell::new(end.format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(format!("{:.4}", window.average)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn median(prices: impl Iterator<Item = f64>) -> Option<f64> {
    let prices = prices.map(OrderedFloat).sorted().collect_vec();
    prices.get(prices.len() / 2).map(|price| price.0)
}

fn color(price: f64, median: Option<f64>) -> Color {
    match median {
        Some(median) if price > median => Color::Red,
        Some(median) if price < median => Color::Green,
        _ => Color::Reset,
    }
}
