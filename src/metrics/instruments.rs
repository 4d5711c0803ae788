//! Summary and gauge instruments

use crate::error::{AppError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Target quantile and its allowed absolute rank error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    pub quantile: f64,
    pub error: f64,
}

/// Validate a metric name against the Prometheus data model
pub fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_first = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':');
    if valid_first && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':') {
        Ok(())
    } else {
        Err(AppError::metrics(format!("invalid metric name '{}'", name)))
    }
}

/// Point-in-time view of a summary
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    /// `(quantile, value)` pairs in objective order
    pub quantiles: Vec<(f64, f64)>,
    pub sum: f64,
    pub count: u64,
}

/// Summary over all observations made during the process lifetime.
///
/// Quantiles are computed exactly from the stored observations, so every
/// objective's error tolerance is met.
#[derive(Debug)]
pub struct Summary {
    name: &'static str,
    help: &'static str,
    objectives: Vec<Objective>,
    observations: Mutex<Vec<f64>>,
}

impl Summary {
    pub fn new(name: &'static str, help: &'static str, objectives: &[(f64, f64)]) -> Result<Self> {
        validate_metric_name(name)?;

        let mut validated = Vec::with_capacity(objectives.len());
        for &(quantile, error) in objectives {
            if !(quantile > 0.0 && quantile < 1.0) {
                return Err(AppError::metrics(format!(
                    "illegal objective quantile {} for summary '{}'",
                    quantile, name
                )));
            }
            if !(0.0..1.0).contains(&error) {
                return Err(AppError::metrics(format!(
                    "illegal objective error {} for quantile {} of summary '{}'",
                    error, quantile, name
                )));
            }
            validated.push(Objective { quantile, error });
        }
        validated.sort_by(|a, b| a.quantile.total_cmp(&b.quantile));

        Ok(Self {
            name,
            help,
            objectives: validated,
            observations: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Record one observation
    pub fn observe(&self, value: f64) {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        let mut values = self
            .observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        values.sort_by(f64::total_cmp);

        let quantiles = self
            .objectives
            .iter()
            .map(|o| (o.quantile, quantile_of_sorted(&values, o.quantile)))
            .collect();

        SummarySnapshot {
            quantiles,
            sum: values.iter().sum(),
            count: values.len() as u64,
        }
    }
}

/// Linear-interpolated quantile of sorted values; NaN when empty
fn quantile_of_sorted(sorted_values: &[f64], quantile: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let index = quantile * (sorted_values.len() as f64 - 1.0);
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        sorted_values[lower_index]
    } else {
        let lower_value = sorted_values[lower_index];
        let upper_value = sorted_values[upper_index];
        let weight = index - lower_index as f64;
        (lower_value + weight * (upper_value - lower_value)).clamp(lower_value, upper_value)
    }
}

/// Single floating point value that can be set
#[derive(Debug)]
pub struct Gauge {
    name: &'static str,
    help: &'static str,
    bits: AtomicU64,
}

impl Gauge {
    pub fn new(name: &'static str, help: &'static str) -> Result<Self> {
        validate_metric_name(name)?;
        Ok(Self {
            name,
            help,
            bits: AtomicU64::new(0f64.to_bits()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}
