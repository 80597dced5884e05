//! CSV ingestion for the dashboard fixtures.
//!
//! Rows that fail validation are rejected here, logged, and counted in a
//! [`LoadReport`]; only clean records ever reach the filter engine.

pub mod cleaner;

use crate::error::IngestError;
use crate::models::{InvestorClass, OwnershipRecord, PriceRecord, RawOwnershipRow, RawPriceRow, SeriesRecord};
use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use self::cleaner::{OhlcSynth, ownership_row_to_record, price_row_to_record};

pub const PRICE_FILE_STEM: &str = "price";

/// What happened to one source file.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub source: String,
    pub accepted: usize,
    pub rejected: Vec<IngestError>,
    /// Rows the CSV reader itself could not frame.
    pub unreadable: usize,
}

impl LoadReport {
    fn new(source: &str) -> Self {
        Self { source: source.to_string(), ..Default::default() }
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.unreadable == 0
    }
}

/// Records from one source plus the report describing them.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub report: LoadReport,
}

fn read_rows<R, Raw, T>(
    source: &str,
    reader: R,
    mut convert: impl FnMut(usize, &Raw) -> Result<T, IngestError>,
) -> Result<Loaded<T>>
where
    R: Read,
    Raw: DeserializeOwned,
    T: SeriesRecord,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .headers()
        .with_context(|| format!("Could not read CSV header of {}", source))?;

    let mut records: Vec<T> = Vec::new();
    let mut report = LoadReport::new(source);

    for (i, result) in reader.deserialize::<Raw>().enumerate() {
        let row = i + 1;
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("{} row {}: {}", source, row, e);
                report.unreadable += 1;
                continue;
            }
        };

        match convert(row, &raw) {
            Ok(record) => {
                if let Some(last) = records.last() {
                    if record.date() < last.date() {
                        warn!(
                            "{} row {}: {} comes before {} (kept in file order)",
                            source, row, record.date(), last.date()
                        );
                    }
                }
                records.push(record);
            }
            Err(e) => {
                warn!("{}: rejected {}", source, e);
                report.rejected.push(e);
            }
        }
    }

    report.accepted = records.len();
    debug!(
        "{}: {} accepted, {} rejected, {} unreadable",
        source,
        report.accepted,
        report.rejected.len(),
        report.unreadable
    );
    Ok(Loaded { records, report })
}

/// Parse a price CSV: date, open, high, low, close (or price).
pub fn load_price_csv<R: Read>(
    source: &str,
    reader: R,
    synth: &mut OhlcSynth,
) -> Result<Loaded<PriceRecord>> {
    read_rows(source, reader, |row, raw: &RawPriceRow| {
        price_row_to_record(row, raw, synth)
    })
}

/// Parse an ownership CSV: date, percentage, volume.
pub fn load_ownership_csv<R: Read>(source: &str, reader: R) -> Result<Loaded<OwnershipRecord>> {
    read_rows(source, reader, |row, raw: &RawOwnershipRow| {
        ownership_row_to_record(row, raw)
    })
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// Everything the dashboard shows for its one instrument.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub price: Vec<PriceRecord>,
    pub ownership: BTreeMap<InvestorClass, Vec<OwnershipRecord>>,
    pub reports: Vec<LoadReport>,
}

impl Dataset {
    pub fn ownership(&self, class: InvestorClass) -> &[OwnershipRecord] {
        self.ownership.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_clean(&self) -> bool {
        self.reports.iter().all(LoadReport::is_clean)
    }

    pub(crate) fn add_price(&mut self, loaded: Loaded<PriceRecord>) {
        self.price = loaded.records;
        self.reports.push(loaded.report);
    }

    pub(crate) fn add_ownership(&mut self, class: InvestorClass, loaded: Loaded<OwnershipRecord>) {
        self.ownership.insert(class, loaded.records);
        self.reports.push(loaded.report);
    }

    /// Load `price.csv` plus any of `individual.csv`, `foreign.csv`,
    /// `institutional.csv` from `dir`. Other CSV files are ignored.
    pub fn load_dir(dir: &Path, seed: u64) -> Result<Self> {
        let files = discover_csv_files(dir)?;
        let price_path = files
            .iter()
            .find(|p| file_stem(p).as_deref() == Some(PRICE_FILE_STEM));
        let Some(price_path) = price_path else {
            bail!("No {}.csv in {:?}", PRICE_FILE_STEM, dir);
        };

        let mut synth = OhlcSynth::new(seed);
        let mut dataset = Dataset::default();
        dataset.add_price(load_price_file(price_path, &mut synth)?);

        for class in InvestorClass::ALL {
            match files.iter().find(|p| file_stem(p).as_deref() == Some(class.name())) {
                Some(path) => dataset.add_ownership(class, load_ownership_file(path)?),
                None => warn!("No {}.csv in {:?}; {} series left empty", class.name(), dir, class.name()),
            }
        }

        for path in &files {
            let stem = file_stem(path);
            let known = stem.as_deref() == Some(PRICE_FILE_STEM)
                || InvestorClass::ALL.iter().any(|c| stem.as_deref() == Some(c.name()));
            if !known {
                debug!("Ignoring {:?}", path);
            }
        }

        info!(
            "Loaded {:?}: {} price points, {} ownership series",
            dir,
            dataset.price.len(),
            dataset.ownership.len()
        );
        Ok(dataset)
    }
}

fn load_price_file(path: &Path, synth: &mut OhlcSynth) -> Result<Loaded<PriceRecord>> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    load_price_csv(&path.display().to_string(), file, synth)
}

fn load_ownership_file(path: &Path) -> Result<Loaded<OwnershipRecord>> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    load_ownership_csv(&path.display().to_string(), file)
}

/// Lower-cased file stem, e.g. `Foreign.CSV` → `foreign`.
pub fn file_stem(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?.trim().to_lowercase();
    if stem.is_empty() { None } else { Some(stem) }
}

pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        bail!("Data directory {:?} does not exist", dir);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_price_csv_rejects_bad_rows() {
        let csv = "\
date,open,high,low,close
2023-01,86000,88000,85000,86400
2023-13,1,2,1,1
2023-07,,,,87600
2024-01-02,105000,109000,104000,107900
";
        let mut synth = OhlcSynth::new(3);
        let loaded = load_price_csv("price.csv", csv.as_bytes(), &mut synth).unwrap();

        let dates: Vec<String> = loaded.records.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2023-01", "2023-07", "2024-01-02"]);
        assert_eq!(loaded.report.accepted, 3);
        assert_eq!(loaded.report.rejected.len(), 1);
        assert_eq!(loaded.report.rejected[0].row(), 2);
        assert!(!loaded.report.is_clean());
    }

    #[test]
    fn test_price_header_alias() {
        let csv = "date,price\n2024-01,100\n2024/04,110\n";
        let mut synth = OhlcSynth::new(3);
        let loaded = load_price_csv("mem", csv.as_bytes(), &mut synth).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[1].close, 110.0);
        assert_eq!(loaded.records[1].date.to_string(), "2024-04");
    }

    #[test]
    fn test_load_ownership_csv_keeps_file_order() {
        let csv = "date,percentage,volume\n2024-01,55.4,1000\n2023-07,56.2,990\n";
        let loaded = load_ownership_csv("individual.csv", csv.as_bytes()).unwrap();
        let pct: Vec<f64> = loaded.records.iter().map(|r| r.percentage).collect();
        assert_eq!(pct, vec![55.4, 56.2]);
        assert!(loaded.report.is_clean());
    }

    #[test]
    fn test_load_dir() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        std::fs::write(dir.join("price.csv"), "date,close\n2024-01,100\n").unwrap();
        std::fs::write(dir.join("Foreign.csv"), "date,percentage,volume\n2024-01,30,10\n").unwrap();
        std::fs::write(dir.join("notes.csv"), "a,b\n1,2\n").unwrap();

        let ds = Dataset::load_dir(dir, 1).unwrap();
        assert_eq!(ds.price.len(), 1);
        assert_eq!(ds.ownership(InvestorClass::Foreign).len(), 1);
        assert!(ds.ownership(InvestorClass::Individual).is_empty());
        assert!(ds.is_clean());
    }

    #[test]
    fn test_load_dir_requires_price_file() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("individual.csv"), "date,percentage,volume\n").unwrap();

        let err = Dataset::load_dir(temp.path(), 1).unwrap_err();
        assert!(err.to_string().contains("No price.csv"), "{err:#}");
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let temp = tempdir().expect("tempdir");
        assert!(Dataset::load_dir(&temp.path().join("absent"), 1).is_err());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("data/Foreign.CSV")).as_deref(), Some("foreign"));
        assert_eq!(file_stem(Path::new("data/price.csv")).as_deref(), Some("price"));
    }
}
