//! Period filtering and summary figures over a time series.
//!
//! Everything here is pure: the caller supplies the series and the date that
//! counts as "now", and gets back fresh values. Nothing is sorted, mutated or
//! cached between calls.
//!
//! ## Window rules
//!
//! The day component of a record date is never consulted.
//!
//! | Period | Retained when |
//! |--------|---------------|
//! | `6M`   | record month ≥ reference month − 6 |
//! | `1Y`   | record year ≥ reference year − 1 |
//! | `2Y`   | record year ≥ reference year − 2 |
//! | `5Y`   | always |

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::models::{Period, RecordDate, SeriesRecord};

/// Filtered series plus its last two points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult<T> {
    pub series: Vec<T>,
    pub latest: Option<T>,
    pub previous: Option<T>,
}

impl<T: SeriesRecord + Clone> FilterResult<T> {
    pub fn summary(&self) -> Summary<T> {
        summarize(&self.series)
    }
}

/// Latest value against the one before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary<T> {
    pub latest: Option<T>,
    pub previous: Option<T>,
    pub change_abs: f64,
    pub change_pct: f64,
}

/// Predicate form of a period, resolved once against the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    FromMonth(i64),
    FromYear(i32),
    All,
}

impl Window {
    fn resolve(period: Period, reference: NaiveDate) -> Self {
        match period {
            Period::SixMonths => match reference.checked_sub_months(Months::new(6)) {
                Some(start) => Window::FromMonth(start.year() as i64 * 12 + start.month0() as i64),
                None => Window::All,
            },
            Period::OneYear => Window::FromYear(reference.year() - 1),
            Period::TwoYears => Window::FromYear(reference.year() - 2),
            Period::FiveYears => Window::All,
        }
    }

    fn contains(&self, date: &RecordDate) -> bool {
        match *self {
            Window::FromMonth(start) => date.month_index() >= start,
            Window::FromYear(year) => date.year() >= year,
            Window::All => true,
        }
    }
}

/// Records of `series` that fall inside `period` as seen from `reference`,
/// in their original order.
pub fn filter_by_period<T>(series: &[T], period: Period, reference: NaiveDate) -> Vec<T>
where
    T: SeriesRecord + Clone,
{
    let window = Window::resolve(period, reference);
    series
        .iter()
        .filter(|r| window.contains(r.date()))
        .cloned()
        .collect()
}

/// Filter and pick out the last two points in one go.
pub fn apply<T>(series: &[T], period: Period, reference: NaiveDate) -> FilterResult<T>
where
    T: SeriesRecord + Clone,
{
    let series = filter_by_period(series, period, reference);
    let (latest, previous) = last_two(&series);
    FilterResult {
        latest: latest.cloned(),
        previous: previous.cloned(),
        series,
    }
}

/// Latest/previous values and their change. Never fails and never returns a
/// non-finite number: a missing or zero baseline yields 0.
pub fn summarize<T>(series: &[T]) -> Summary<T>
where
    T: SeriesRecord + Clone,
{
    let (latest, previous) = last_two(series);

    let (change_abs, change_pct) = match (latest, previous) {
        (Some(l), Some(p)) => {
            let abs = finite_or_zero(l.value() - p.value());
            let pct = if p.value() != 0.0 {
                finite_or_zero(abs / p.value() * 100.0)
            } else {
                0.0
            };
            (abs, pct)
        }
        _ => (0.0, 0.0),
    };

    Summary {
        latest: latest.cloned(),
        previous: previous.cloned(),
        change_abs,
        change_pct,
    }
}

fn last_two<T>(series: &[T]) -> (Option<&T>, Option<&T>) {
    match series {
        [] => (None, None),
        [only] => (Some(only), None),
        [.., prev, last] => (Some(last), Some(prev)),
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
