//! Sample dataset compiled into the binary.

use crate::loader::cleaner::OhlcSynth;
use crate::loader::{Dataset, load_ownership_csv, load_price_csv};
use crate::models::InvestorClass;
use anyhow::Result;
use tracing::debug;

const PRICE_CSV: &str = include_str!("../../data/price.csv");
const INDIVIDUAL_CSV: &str = include_str!("../../data/individual.csv");
const FOREIGN_CSV: &str = include_str!("../../data/foreign.csv");
const INSTITUTIONAL_CSV: &str = include_str!("../../data/institutional.csv");

fn bundled_ownership(class: InvestorClass) -> &'static str {
    match class {
        InvestorClass::Individual => INDIVIDUAL_CSV,
        InvestorClass::Foreign => FOREIGN_CSV,
        InvestorClass::Institutional => INSTITUTIONAL_CSV,
    }
}

impl Dataset {
    /// The bundled sample data. `seed` drives OHLC completion of close-only rows.
    pub fn bundled(seed: u64) -> Result<Self> {
        let mut synth = OhlcSynth::new(seed);
        let mut dataset = Dataset::default();

        dataset.add_price(load_price_csv("bundled:price.csv", PRICE_CSV.as_bytes(), &mut synth)?);
        for class in InvestorClass::ALL {
            let source = format!("bundled:{}.csv", class.name());
            let loaded = load_ownership_csv(&source, bundled_ownership(class).as_bytes())?;
            dataset.add_ownership(class, loaded);
        }

        debug!("Bundled dataset: {} price points", dataset.price.len());
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeriesRecord;

    #[test]
    fn test_bundled_data_is_clean_and_sorted() {
        let ds = Dataset::bundled(0).unwrap();
        assert!(ds.is_clean(), "{:#?}", ds.reports);
        assert!(!ds.price.is_empty());

        for class in InvestorClass::ALL {
            let series = ds.ownership(class);
            assert!(!series.is_empty(), "{:?}", class);
            assert!(series.windows(2).all(|w| w[0].date() <= w[1].date()));
        }
        assert!(ds.price.windows(2).all(|w| w[0].date() <= w[1].date()));
    }

    #[test]
    fn test_bundled_prices_satisfy_ohlc_bounds() {
        let ds = Dataset::bundled(99).unwrap();
        for r in &ds.price {
            assert!(r.low <= r.open.min(r.close) && r.open.max(r.close) <= r.high, "{r:?}");
        }
    }

    #[test]
    fn test_bundled_is_deterministic_per_seed() {
        assert_eq!(Dataset::bundled(5).unwrap().price, Dataset::bundled(5).unwrap().price);
    }
}
