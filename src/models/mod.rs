use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseDateError;

// ── Record date ───────────────────────────────────────────────────────────────

/// A `YYYY-MM` or `YYYY-MM-DD` date as it appears in the fixture data.
///
/// Serialises back to its canonical string so downstream renderers keep
/// reading a plain `date` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RecordDate {
    year: i32,
    month: u32,
    day: Option<u32>,
}

impl RecordDate {
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// Months since year 0; used for month-granularity window tests.
    pub fn month_index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }
}

impl FromStr for RecordDate {
    type Err = ParseDateError;

    /// "2024-01" | "2024-01-15" | "2024/01/15" (spreadsheet exports)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseDateError(s.to_string());
        let normalised = s.trim().replace('/', "-");
        let parts: Vec<&str> = normalised.split('-').collect();

        let year = parts.first().ok_or_else(bad)?;
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }

        match parts.len() {
            2 => {
                let d = NaiveDate::parse_from_str(&format!("{normalised}-01"), "%Y-%m-%d")
                    .map_err(|_| bad())?;
                Ok(Self { year: d.year(), month: d.month(), day: None })
            }
            3 => {
                let d = NaiveDate::parse_from_str(&normalised, "%Y-%m-%d").map_err(|_| bad())?;
                Ok(Self { year: d.year(), month: d.month(), day: Some(d.day()) })
            }
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)?;
        if let Some(day) = self.day {
            write!(f, "-{:02}", day)?;
        }
        Ok(())
    }
}

impl From<RecordDate> for String {
    fn from(d: RecordDate) -> Self {
        d.to_string()
    }
}

impl TryFrom<String> for RecordDate {
    type Error = ParseDateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// Anything the period filter can window and summarise.
pub trait SeriesRecord {
    fn date(&self) -> &RecordDate;

    /// The field summaries are computed over.
    fn value(&self) -> f64;
}

/// One OHLC price point. `open` and `close` lie within `[low, high]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: RecordDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    #[serde(alias = "price")]
    pub close: f64,
}

/// Share of outstanding stock held by one investor class at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub date: RecordDate,
    pub percentage: f64,
    pub volume: u64,
}

/// Either record shape, serialised flat so field names stay intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSeriesRecord {
    Price(PriceRecord),
    Ownership(OwnershipRecord),
}

impl SeriesRecord for PriceRecord {
    fn date(&self) -> &RecordDate {
        &self.date
    }

    fn value(&self) -> f64 {
        self.close
    }
}

impl SeriesRecord for OwnershipRecord {
    fn date(&self) -> &RecordDate {
        &self.date
    }

    fn value(&self) -> f64 {
        self.percentage
    }
}

impl SeriesRecord for TimeSeriesRecord {
    fn date(&self) -> &RecordDate {
        match self {
            Self::Price(r) => &r.date,
            Self::Ownership(r) => &r.date,
        }
    }

    fn value(&self) -> f64 {
        match self {
            Self::Price(r) => r.value(),
            Self::Ownership(r) => r.value(),
        }
    }
}

impl From<PriceRecord> for TimeSeriesRecord {
    fn from(r: PriceRecord) -> Self {
        Self::Price(r)
    }
}

impl From<OwnershipRecord> for TimeSeriesRecord {
    fn from(r: OwnershipRecord) -> Self {
        Self::Ownership(r)
    }
}

// ── Period selector ───────────────────────────────────────────────────────────

/// History window shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Period {
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
            Self::TwoYears => "2Y",
            Self::FiveYears => "5Y",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SixMonths => "last 6 months",
            Self::OneYear => "since January of last year",
            Self::TwoYears => "since January two years ago",
            Self::FiveYears => "full history",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Unknown tokens select the full history.
impl From<&str> for Period {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "6M" => Self::SixMonths,
            "1Y" => Self::OneYear,
            "2Y" => Self::TwoYears,
            _ => Self::FiveYears,
        }
    }
}

impl From<String> for Period {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.token().to_string()
    }
}

impl FromStr for Period {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

// ── Investor classes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorClass {
    Individual,
    Foreign,
    Institutional,
}

impl InvestorClass {
    pub const ALL: [InvestorClass; 3] = [
        InvestorClass::Individual,
        InvestorClass::Foreign,
        InvestorClass::Institutional,
    ];

    /// Series name, also the fixture file stem.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Foreign => "foreign",
            Self::Institutional => "institutional",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Individual => "Individual holding",
            Self::Foreign => "Foreign holding",
            Self::Institutional => "Institutional holding",
        }
    }
}

// ── Raw CSV rows ──────────────────────────────────────────────────────────────

/// Price CSV: date, open, high, low, close (or price)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPriceRow {
    pub date: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    #[serde(alias = "price")]
    pub close: Option<String>,
}

/// Ownership CSV: date, percentage, volume
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOwnershipRow {
    pub date: Option<String>,
    pub percentage: Option<String>,
    pub volume: Option<String>,
}
