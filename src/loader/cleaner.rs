use crate::error::IngestError;
use crate::models::{OwnershipRecord, PriceRecord, RawOwnershipRow, RawPriceRow, RecordDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

// ── Parsers ───────────────────────────────────────────────────────────────────

fn is_blank(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s == "N/A" || s == "-" || s == "—"
}

const CURRENCY_MARKS: [&str; 7] = ["KRW", "₩", "원", "$", "€", "£", "¥"];

/// Parse a number, stripping currency marks and thousands separators only.
/// "₩107,900" → 107900.0 | "55.4" → 55.4 | "1O0" → None
pub fn parse_number(s: &str) -> Option<f64> {
    if is_blank(s) {
        return None;
    }
    let mut cleaned = s.trim().to_string();
    for mark in CURRENCY_MARKS {
        cleaned = cleaned.replace(mark, "");
    }
    let cleaned: String = cleaned.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    cleaned.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Parse a percentage, with or without a trailing '%'.
pub fn parse_pct(s: &str) -> Option<f64> {
    let s = s.trim().replace('%', "").replace(',', "");
    if is_blank(&s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Parse volume with K/M/B suffixes.
/// "1.2M" → 1,200,000 | "345K" → 345,000 | "12,345" → 12345
pub fn parse_volume(s: &str) -> Option<i64> {
    let s = s.trim().to_uppercase().replace(',', "");
    if is_blank(&s) {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('B') {
        (n, 1_000_000_000.0)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1_000.0)
    } else {
        return s.parse().ok();
    };

    let num: f64 = num_str.trim().parse().ok()?;
    Some((num * multiplier).round() as i64)
}

// ── Synthetic OHLC ────────────────────────────────────────────────────────────

/// Fills in open/high/low for rows that only carry a close.
///
/// open: close ±2% | high: max(open, close) + 0.5..3% | low: min(open, close) − 0.5..3%,
/// each rounded to whole units. Seeded so a given dataset always completes the same way.
pub struct OhlcSynth {
    rng: StdRng,
}

impl OhlcSynth {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Returns `(open, high, low)` with `low <= open, close <= high`.
    pub fn complete(
        &mut self,
        close: f64,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
    ) -> (f64, f64, f64) {
        let open = open.unwrap_or_else(|| {
            let variation = self.rng.gen_range(-0.02..=0.02);
            (close * (1.0 + variation)).round()
        });

        let high = high.unwrap_or_else(|| {
            let variation = self.rng.gen_range(0.005..=0.03);
            (open.max(close) * (1.0 + variation)).round()
        });

        let low = low.unwrap_or_else(|| {
            let variation = self.rng.gen_range(0.005..=0.03);
            (open.min(close) * (1.0 - variation)).round()
        });

        (open, high.max(open).max(close), low.min(open).min(close))
    }
}

// ── Price CSV → PriceRecord ───────────────────────────────────────────────────

fn parse_date_field(row: usize, raw: Option<&str>) -> Result<RecordDate, IngestError> {
    let s = raw
        .filter(|s| !is_blank(s))
        .ok_or(IngestError::MissingField { row, field: "date" })?;
    s.parse()
        .map_err(|source| IngestError::MalformedDate { row, source })
}

fn optional_number(
    row: usize,
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<f64>, IngestError> {
    match raw {
        None => Ok(None),
        Some(s) if is_blank(s) => Ok(None),
        Some(s) => parse_number(s).map(Some).ok_or_else(|| IngestError::InvalidNumber {
            row,
            field,
            value: s.to_string(),
        }),
    }
}

pub fn price_row_to_record(
    row: usize,
    raw: &RawPriceRow,
    synth: &mut OhlcSynth,
) -> Result<PriceRecord, IngestError> {
    let date = parse_date_field(row, raw.date.as_deref())?;

    let close = optional_number(row, "close", raw.close.as_deref())?
        .ok_or(IngestError::MissingField { row, field: "close" })?;
    if close <= 0.0 {
        return Err(IngestError::OutOfRange { row, field: "close", value: close });
    }

    let open = optional_number(row, "open", raw.open.as_deref())?;
    let high = optional_number(row, "high", raw.high.as_deref())?;
    let low = optional_number(row, "low", raw.low.as_deref())?;

    if let (Some(open), Some(high), Some(low)) = (open, high, low) {
        if high < open.max(close) {
            return Err(IngestError::OutOfRange { row, field: "high", value: high });
        }
        if low > open.min(close) {
            return Err(IngestError::OutOfRange { row, field: "low", value: low });
        }
        return Ok(PriceRecord { date, open, high, low, close });
    }

    let (open, high, low) = synth.complete(close, open, high, low);
    debug!("row {}: synthesised OHLC for {} ({}/{}/{}/{})", row, date, open, high, low, close);
    Ok(PriceRecord { date, open, high, low, close })
}

// ── Ownership CSV → OwnershipRecord ───────────────────────────────────────────

pub fn ownership_row_to_record(
    row: usize,
    raw: &RawOwnershipRow,
) -> Result<OwnershipRecord, IngestError> {
    let date = parse_date_field(row, raw.date.as_deref())?;

    let pct_str = raw
        .percentage
        .as_deref()
        .filter(|s| !is_blank(s))
        .ok_or(IngestError::MissingField { row, field: "percentage" })?;
    let percentage = parse_pct(pct_str).ok_or_else(|| IngestError::InvalidNumber {
        row,
        field: "percentage",
        value: pct_str.to_string(),
    })?;
    if !(0.0..=100.0).contains(&percentage) {
        return Err(IngestError::OutOfRange { row, field: "percentage", value: percentage });
    }

    let volume = match raw.volume.as_deref().filter(|s| !is_blank(s)) {
        None => 0,
        Some(s) => {
            let v = parse_volume(s).ok_or_else(|| IngestError::InvalidNumber {
                row,
                field: "volume",
                value: s.to_string(),
            })?;
            u64::try_from(v).map_err(|_| IngestError::OutOfRange {
                row,
                field: "volume",
                value: v as f64,
            })?
        }
    };

    Ok(OwnershipRecord { date, percentage, volume })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn price_row(date: &str, open: &str, high: &str, low: &str, close: &str) -> RawPriceRow {
        let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        RawPriceRow {
            date: opt(date),
            open: opt(open),
            high: opt(high),
            low: opt(low),
            close: opt(close),
        }
    }

    fn ownership_row(date: &str, pct: &str, volume: &str) -> RawOwnershipRow {
        RawOwnershipRow {
            date: Some(date.to_string()),
            percentage: Some(pct.to_string()),
            volume: Some(volume.to_string()),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("₩107,900"), Some(107_900.0));
        assert_eq!(parse_number(" 55.4 "), Some(55.4));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("KRW 1,200.5"), Some(1_200.5));
    }

    #[test]
    fn test_parse_number_rejects_stray_characters() {
        assert_eq!(parse_number("1O0"), None);
        assert_eq!(parse_number("100x"), None);
        assert_eq!(parse_number("12.3.4"), None);
        assert_eq!(parse_number("inf"), None);

        let mut synth = OhlcSynth::new(1);
        let err = price_row_to_record(4, &price_row("2024-01", "", "", "", "1O0"), &mut synth)
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidNumber { row: 4, field: "close", .. }));
    }

    #[test]
    fn test_parse_pct() {
        assert_eq!(parse_pct("55.4%"), Some(55.4));
        assert_eq!(parse_pct("12"), Some(12.0));
        assert_eq!(parse_pct("-"), None);
    }

    #[test]
    fn test_parse_volume() {
        assert_eq!(parse_volume("1.2M"), Some(1_200_000));
        assert_eq!(parse_volume("345K"), Some(345_000));
        assert_eq!(parse_volume("1.5B"), Some(1_500_000_000));
        assert_eq!(parse_volume("12,345"), Some(12_345));
        assert_eq!(parse_volume("lots"), None);
    }

    #[test]
    fn test_full_price_row() {
        let mut synth = OhlcSynth::new(1);
        let r = price_row_to_record(1, &price_row("2024-01", "100", "120", "90", "110"), &mut synth)
            .unwrap();
        assert_eq!((r.open, r.high, r.low, r.close), (100.0, 120.0, 90.0, 110.0));
    }

    #[test]
    fn test_close_only_row_gets_consistent_ohlc() {
        let mut synth = OhlcSynth::new(42);
        for i in 0..200 {
            let close = 50_000.0 + i as f64 * 137.0;
            let raw = price_row("2024-01", "", "", "", &close.to_string());
            let r = price_row_to_record(i, &raw, &mut synth).unwrap();
            assert!(r.low <= r.open && r.open <= r.high, "{r:?}");
            assert!(r.low <= r.close && r.close <= r.high, "{r:?}");
            assert!((r.open - close).abs() <= close * 0.02 + 1.0);
        }
    }

    #[test]
    fn test_synthesis_is_reproducible() {
        let run = |seed| {
            let mut synth = OhlcSynth::new(seed);
            (0..10).map(|_| synth.complete(80_000.0, None, None, None)).collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_inconsistent_ohlc_is_rejected() {
        let mut synth = OhlcSynth::new(1);
        let err = price_row_to_record(3, &price_row("2024-01", "100", "105", "90", "110"), &mut synth)
            .unwrap_err();
        assert!(matches!(err, IngestError::OutOfRange { row: 3, field: "high", .. }));
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        let mut synth = OhlcSynth::new(1);
        let err = price_row_to_record(5, &price_row("2024-1x", "", "", "", "100"), &mut synth)
            .unwrap_err();
        assert!(matches!(err, IngestError::MalformedDate { row: 5, .. }));

        let err = ownership_row_to_record(6, &ownership_row("July 2024", "50", "10")).unwrap_err();
        assert!(matches!(err, IngestError::MalformedDate { row: 6, .. }));
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let mut synth = OhlcSynth::new(1);
        let err = price_row_to_record(1, &price_row("2024-01", "", "", "", ""), &mut synth)
            .unwrap_err();
        assert_eq!(err, IngestError::MissingField { row: 1, field: "close" });

        let err = price_row_to_record(2, &price_row("2024-01", "x", "", "", "10"), &mut synth)
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidNumber { field: "open", .. }));

        let err = price_row_to_record(3, &price_row("2024-01", "", "", "", "0"), &mut synth)
            .unwrap_err();
        assert!(matches!(err, IngestError::OutOfRange { field: "close", .. }));
    }

    #[test]
    fn test_ownership_row() {
        let r = ownership_row_to_record(1, &ownership_row("2024-01", "55.4%", "1.2M")).unwrap();
        assert_eq!(r.percentage, 55.4);
        assert_eq!(r.volume, 1_200_000);

        let r = ownership_row_to_record(1, &ownership_row("2024-01", "0", "")).unwrap();
        assert_eq!(r.volume, 0);

        let err = ownership_row_to_record(2, &ownership_row("2024-01", "101", "1")).unwrap_err();
        assert!(matches!(err, IngestError::OutOfRange { field: "percentage", .. }));

        let err = ownership_row_to_record(3, &ownership_row("2024-01", "10", "-5")).unwrap_err();
        assert!(matches!(err, IngestError::OutOfRange { field: "volume", .. }));
    }
}
