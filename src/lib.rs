//! Price and shareholder-composition dashboard over bundled sample data.
//!
//! The interesting part is [`engine`]: windowing a time series to a selected
//! period and deriving latest/previous/change figures. Everything else feeds
//! it ([`loader`], [`data`]) or presents its output ([`dashboard`]).

pub mod config;
pub mod dashboard;
pub mod data;
pub mod engine;
pub mod error;
pub mod loader;
pub mod models;
pub mod utils;
