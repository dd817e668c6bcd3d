//! Price loading for the runner.
//!
//! Reads a daily price CSV with at least `Date`, `Open` and `Close` columns
//! (the layout Yahoo Finance exports; extra columns are ignored) into a
//! `PriceSeries`. Rows whose prices are `null` or blank are skipped with a
//! warning, which is how Yahoo marks non-trading placeholder rows.
//!
//! Also provides a seeded synthetic random walk for tests and demos. Synthetic
//! series are clearly fake and never a substitute for real history.

use std::io::{Read, Write};
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use dcalab_core::{Bar, PriceSeries, SeriesError};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { row: usize, value: String },

    #[error("row {row}: invalid {column} value '{value}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("no price rows in input")]
    Empty,

    #[error("series error: {0}")]
    Series(#[from] SeriesError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: String,
    #[serde(rename = "Close")]
    close: String,
}

/// Load a price CSV from disk.
pub fn load_price_csv(path: &Path) -> Result<PriceSeries, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let series = read_price_csv(file)?;
    debug!(path = %path.display(), bars = series.len(), "loaded price series");
    Ok(series)
}

/// Parse a price CSV from any reader.
pub fn read_price_csv<R: Read>(reader: R) -> Result<PriceSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for (i, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = i + 1;
        let record = record?;
        let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").map_err(|_| {
            LoadError::InvalidDate {
                row,
                value: record.date.clone(),
            }
        })?;
        let (Some(open), Some(close)) = (
            parse_price(row, "Open", &record.open)?,
            parse_price(row, "Close", &record.close)?,
        ) else {
            skipped += 1;
            continue;
        };
        bars.push(Bar::new(date, open, close));
    }

    if skipped > 0 {
        warn!(skipped, "skipped rows with missing prices");
    }
    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(PriceSeries::new(bars)?)
}

fn parse_price(row: usize, column: &'static str, raw: &str) -> Result<Option<f64>, LoadError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(LoadError::InvalidNumber {
            row,
            column,
            value: raw.to_string(),
        }),
    }
}

/// Write a series as `Date,Open,Close` CSV.
pub fn write_price_csv<W: Write>(series: &PriceSeries, writer: W) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Date", "Open", "Close"])?;
    for bar in series {
        wtr.write_record([
            bar.date.format("%Y-%m-%d").to_string(),
            format!("{:.6}", bar.open),
            format!("{:.6}", bar.close),
        ])?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: "<writer>".into(),
        source,
    })?;
    Ok(())
}

/// Deterministic BLAKE3 hash over every bar's date and prices.
pub fn dataset_hash(series: &PriceSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in series {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Seeded random walk over `days` business days starting at `start`.
///
/// Starts at 100.0; each bar opens at the prior close with a small gap.
pub fn synthetic_series(start: NaiveDate, days: usize, seed: u64) -> PriceSeries {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(days);
    let mut price = 100.0_f64;
    let mut current = start;

    while bars.len() < days {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let gap: f64 = rng.gen_range(-0.005..0.005);
        let daily_return: f64 = rng.gen_range(-0.02..0.021);
        let open = price * (1.0 + gap);
        let close = open * (1.0 + daily_return);
        bars.push(Bar::new(current, open, close));

        price = close;
        current += chrono::Duration::days(1);
    }

    // Dates are generated strictly ascending.
    PriceSeries::new(bars).unwrap_or_default()
}
