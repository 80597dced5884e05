//! Dashboard view-model.
//!
//! [`DashboardState`] is the only mutable thing on screen: which period is
//! selected and what date counts as "now". Every change rebuilds a
//! [`DashboardView`] from scratch through the filter engine.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::engine::{self, FilterResult};
use crate::loader::Dataset;
use crate::models::{InvestorClass, OwnershipRecord, Period, PriceRecord, SeriesRecord};
use crate::utils::{fmt_change, fmt_rate, fmt_won};

pub const PRICE_SERIES: &str = "price";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardState {
    selected_period: Period,
    reference_date: NaiveDate,
}

impl DashboardState {
    pub fn new(selected_period: Period, reference_date: NaiveDate) -> Self {
        Self { selected_period, reference_date }
    }

    pub fn select(&mut self, period: Period) {
        self.selected_period = period;
    }

    pub fn selected_period(&self) -> Period {
        self.selected_period
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }
}

/// One filtered series with its change figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView<T> {
    #[serde(flatten)]
    pub filtered: FilterResult<T>,
    pub change_abs: f64,
    pub change_pct: f64,
}

impl<T: SeriesRecord + Clone> SeriesView<T> {
    fn build(series: &[T], state: &DashboardState) -> Self {
        let filtered = engine::apply(series, state.selected_period, state.reference_date);
        let summary = filtered.summary();
        Self {
            filtered,
            change_abs: summary.change_abs,
            change_pct: summary.change_pct,
        }
    }

    pub fn latest_value(&self) -> f64 {
        self.filtered.latest.as_ref().map(|r| r.value()).unwrap_or(0.0)
    }
}

/// A titled headline figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub title: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

impl StatCard {
    pub fn change_label(&self) -> Option<String> {
        self.change.map(fmt_change)
    }
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub period: Period,
    pub reference_date: NaiveDate,
    pub price: SeriesView<PriceRecord>,
    pub ownership: BTreeMap<InvestorClass, SeriesView<OwnershipRecord>>,
}

impl DashboardView {
    pub fn build(dataset: &Dataset, state: &DashboardState) -> Self {
        let price = SeriesView::build(&dataset.price, state);
        let ownership: BTreeMap<_, _> = InvestorClass::ALL
            .into_iter()
            .map(|class| (class, SeriesView::build(dataset.ownership(class), state)))
            .collect();

        debug!(
            "View {} as of {}: {} of {} price points, ownership {:?}",
            state.selected_period,
            state.reference_date,
            price.filtered.series.len(),
            dataset.price.len(),
            ownership
                .iter()
                .map(|(c, v)| (c.name(), v.filtered.series.len()))
                .collect::<Vec<_>>()
        );

        Self {
            period: state.selected_period,
            reference_date: state.reference_date,
            price,
            ownership,
        }
    }

    /// Current price with its change, then the latest holding rate per class.
    pub fn cards(&self) -> Vec<StatCard> {
        let mut cards = vec![StatCard {
            title: "Current price".to_string(),
            value: fmt_won(self.price.latest_value()),
            change: Some(self.price.change_pct),
        }];

        for (class, view) in &self.ownership {
            cards.push(StatCard {
                title: class.title().to_string(),
                value: fmt_rate(view.latest_value()),
                change: None,
            });
        }
        cards
    }

    /// Names accepted by [`DashboardView::series_json`].
    pub fn series_names() -> Vec<&'static str> {
        std::iter::once(PRICE_SERIES)
            .chain(InvestorClass::ALL.iter().map(|c| c.name()))
            .collect()
    }

    pub fn series_json(&self, name: &str) -> serde_json::Result<Option<Value>> {
        if name == PRICE_SERIES {
            return serde_json::to_value(&self.price).map(Some);
        }
        match InvestorClass::ALL.into_iter().find(|c| c.name() == name) {
            Some(class) => serde_json::to_value(&self.ownership[&class]).map(Some),
            None => Ok(None),
        }
    }

    /// Payload for a rendering surface; `only` restricts it to one series.
    pub fn export(&self, only: Option<&str>) -> serde_json::Result<Value> {
        let mut series = Map::new();
        for name in Self::series_names() {
            if only.is_some_and(|o| o != name) {
                continue;
            }
            if let Some(v) = self.series_json(name)? {
                series.insert(name.to_string(), v);
            }
        }

        let mut out = Map::new();
        out.insert("period".into(), Value::from(self.period.token()));
        out.insert("reference_date".into(), Value::from(self.reference_date.to_string()));
        out.insert("series".into(), Value::Object(series));
        Ok(Value::Object(out))
    }
}
