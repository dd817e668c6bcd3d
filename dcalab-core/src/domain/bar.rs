//! Bar and PriceSeries: the market data the simulator walks over.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One trading day for a single instrument.
///
/// Only the open and close are used: purchases fill at the open, valuation
/// happens at the close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, close: f64) -> Self {
        Self { date, open, close }
    }

    /// Both prices finite and strictly positive.
    pub fn has_positive_prices(&self) -> bool {
        self.open.is_finite() && self.close.is_finite() && self.open > 0.0 && self.close > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bars out of order: {next} does not follow {prev}")]
    UnorderedDates { prev: NaiveDate, next: NaiveDate },
}

/// Date-ordered sequence of daily bars.
///
/// Dates are strictly ascending (no duplicates). Gaps are allowed. The series
/// may be empty; the simulator is the one that rejects empty input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for w in bars.windows(2) {
            if w[1].date <= w[0].date {
                return Err(SeriesError::UnorderedDates {
                    prev: w[0].date,
                    next: w[1].date,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }
}

impl TryFrom<Vec<Bar>> for PriceSeries {
    type Error = SeriesError;

    fn try_from(bars: Vec<Bar>) -> Result<Self, Self::Error> {
        PriceSeries::new(bars)
    }
}

impl From<PriceSeries> for Vec<Bar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn bar_positive_prices() {
        assert!(Bar::new(day(2), 100.0, 101.0).has_positive_prices());
        assert!(!Bar::new(day(2), 0.0, 101.0).has_positive_prices());
        assert!(!Bar::new(day(2), 100.0, -1.0).has_positive_prices());
    }

    #[test]
    fn bar_rejects_non_finite_prices() {
        assert!(!Bar::new(day(2), f64::NAN, 101.0).has_positive_prices());
        assert!(!Bar::new(day(2), 100.0, f64::INFINITY).has_positive_prices());
    }

    #[test]
    fn series_accepts_ascending_with_gaps() {
        let s = PriceSeries::new(vec![
            Bar::new(day(2), 1.0, 1.0),
            Bar::new(day(3), 1.0, 1.0),
            Bar::new(day(8), 1.0, 1.0),
        ])
        .unwrap();
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn series_rejects_duplicate_date() {
        let err = PriceSeries::new(vec![Bar::new(day(2), 1.0, 1.0), Bar::new(day(2), 1.0, 1.0)])
            .unwrap_err();
        assert_eq!(
            err,
            SeriesError::UnorderedDates {
                prev: day(2),
                next: day(2)
            }
        );
    }

    #[test]
    fn series_rejects_descending() {
        assert!(
            PriceSeries::new(vec![Bar::new(day(5), 1.0, 1.0), Bar::new(day(4), 1.0, 1.0)])
                .is_err()
        );
    }

    #[test]
    fn empty_series_is_allowed() {
        assert!(PriceSeries::new(vec![]).unwrap().is_empty());
    }

    #[test]
    fn series_deserialization_validates_order() {
        let json = r#"[{"date":"2024-01-03","open":1.0,"close":1.0},{"date":"2024-01-02","open":1.0,"close":1.0}]"#;
        assert!(serde_json::from_str::<PriceSeries>(json).is_err());
    }
}
