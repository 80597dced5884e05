use std::time::{Duration, Instant};
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.elapsed()
        );
    }
}

/// Format a large integer with thousands separators.
pub fn fmt_number(n: i64) -> String {
    let s = n.abs().to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    if n < 0 {
        result.push('-');
    }
    result.chars().rev().collect()
}

/// Whole-won price, e.g. `₩107,900`.
pub fn fmt_won(price: f64) -> String {
    format!("₩{}", fmt_number(price.round() as i64))
}

/// Holding rate as shown on a stat card: `55.4%`.
pub fn fmt_rate(pct: f64) -> String {
    format!("{}%", pct)
}

/// Signed change with an arrow and two decimals of its magnitude: `▲ 23.17%`.
pub fn fmt_change(pct: f64) -> String {
    let arrow = if pct >= 0.0 { '▲' } else { '▼' };
    format!("{} {:.2}%", arrow, pct.abs())
}
