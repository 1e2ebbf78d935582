//! Data-quality validation for the Telco customer table.
//!
//! Every rule runs independently and appends to the report; nothing
//! short-circuits and a failed check never returns `Err`. Callers inspect
//! [`ValidationReport::success`] and decide what to do.

use super::{coerce_numeric, series, string_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Columns that must be present and null-free
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "customerID",
    "gender",
    "Partner",
    "Dependents",
    "PhoneService",
    "InternetService",
    "Contract",
    "tenure",
    "MonthlyCharges",
    "TotalCharges",
    "Churn",
];

/// A single failed rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    MissingColumn(String),
    NullsInColumn(String),
    InvalidValues { column: String, fraction: f64 },
    NonNumeric(String),
    OutOfBounds(String),
    Negative(String),
    TotalVsMonthlyRatio(f64),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingColumn(col) => write!(f, "missing_column:{}", col),
            Violation::NullsInColumn(col) => write!(f, "nulls_in_column:{}", col),
            Violation::InvalidValues { column, fraction } => {
                write!(f, "invalid_values_in_{}:{:.2}", column, fraction)
            }
            Violation::NonNumeric(col) => write!(f, "non_numeric:{}", col),
            Violation::OutOfBounds(col) => write!(f, "{}_out_of_bounds", col),
            Violation::Negative(col) => write!(f, "{}_negative", col),
            Violation::TotalVsMonthlyRatio(ratio) => write!(f, "total_vs_monthly_ratio:{:.2}", ratio),
        }
    }
}

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub success: bool,
    pub violations: Vec<Violation>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Violation tags in the order they were found
    pub fn failures(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }

    /// `(success, failure tags)`
    pub fn into_parts(self) -> (bool, Vec<String>) {
        let failures = self.failures();
        (self.success, failures)
    }
}

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericBounds {
    pub min: f64,
    pub max: f64,
}

impl NumericBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Validator for the raw Telco churn table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelcoValidator {
    pub required_columns: Vec<String>,
    /// (column, allowed values), checked in this order
    pub categorical_domains: Vec<(String, Vec<String>)>,
    pub tenure_bounds: NumericBounds,
    pub monthly_charges_bounds: NumericBounds,
    /// Minimum share of rows with TotalCharges >= MonthlyCharges
    pub min_total_vs_monthly_ratio: f64,
}

impl Default for TelcoValidator {
    fn default() -> Self {
        let domain = |col: &str, allowed: &[&str]| {
            (col.to_string(), allowed.iter().map(|s| s.to_string()).collect())
        };

        Self {
            required_columns: REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect(),
            categorical_domains: vec![
                domain("gender", &["Male", "Female"]),
                domain("Partner", &["Yes", "No"]),
                domain("Dependents", &["Yes", "No"]),
                domain("PhoneService", &["Yes", "No"]),
                domain("Contract", &["Month-to-month", "One year", "Two year"]),
                domain("InternetService", &["DSL", "Fiber optic", "No"]),
            ],
            tenure_bounds: NumericBounds::new(0.0, 120.0),
            monthly_charges_bounds: NumericBounds::new(0.0, 200.0),
            min_total_vs_monthly_ratio: 0.9,
        }
    }
}

impl TelcoValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every rule against `df` and collect the violations
    pub fn validate(&self, df: &DataFrame) -> ValidationReport {
        info!(rows = df.height(), columns = df.width(), "Starting data validation");

        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        self.check_schema(df, &mut violations);
        self.check_categoricals(df, &mut violations);
        self.check_bounded_numeric(df, "tenure", self.tenure_bounds, &mut violations);
        self.check_bounded_numeric(df, "MonthlyCharges", self.monthly_charges_bounds, &mut violations);
        self.check_total_charges(df, &mut violations, &mut warnings);
        self.check_total_vs_monthly(df, &mut violations);

        let success = violations.is_empty();
        let report = ValidationReport {
            success,
            violations,
            warnings,
        };

        if success {
            info!("Data validation passed");
        } else {
            warn!(failures = ?report.failures(), "Data validation failed");
        }

        report
    }

    fn check_schema(&self, df: &DataFrame, violations: &mut Vec<Violation>) {
        for col in &self.required_columns {
            match series(df, col) {
                None => violations.push(Violation::MissingColumn(col.clone())),
                Some(s) if s.null_count() > 0 => {
                    violations.push(Violation::NullsInColumn(col.clone()))
                }
                Some(_) => {}
            }
        }
    }

    fn check_categoricals(&self, df: &DataFrame, violations: &mut Vec<Violation>) {
        for (col, allowed) in &self.categorical_domains {
            let Some(s) = series(df, col) else { continue };
            let values = string_values(s);
            if values.is_empty() {
                continue;
            }

            let invalid = values
                .iter()
                .filter(|v| match v {
                    Some(v) => !allowed.iter().any(|a| a == v),
                    None => true,
                })
                .count();

            if invalid > 0 {
                violations.push(Violation::InvalidValues {
                    column: col.clone(),
                    fraction: invalid as f64 / values.len() as f64,
                });
            }
        }
    }

    fn check_bounded_numeric(
        &self,
        df: &DataFrame,
        col: &str,
        bounds: NumericBounds,
        violations: &mut Vec<Violation>,
    ) {
        let Some(s) = series(df, col) else { return };
        let values = coerce_numeric(s);

        if values.iter().any(Option::is_none) {
            violations.push(Violation::NonNumeric(col.to_string()));
        } else if values.iter().flatten().any(|&v| !bounds.contains(v)) {
            violations.push(Violation::OutOfBounds(col.to_string()));
        }
    }

    fn check_total_charges(
        &self,
        df: &DataFrame,
        violations: &mut Vec<Violation>,
        warnings: &mut Vec<String>,
    ) {
        let Some(s) = series(df, "TotalCharges") else { return };
        let values = coerce_numeric(s);

        let non_numeric = values.iter().filter(|v| v.is_none()).count();
        if non_numeric > 0 {
            // the public dataset ships blank TotalCharges for new customers
            warn!(
                count = non_numeric,
                "TotalCharges has non-numeric values; they are handled in preprocessing"
            );
            warnings.push(format!("non_numeric_values_in_TotalCharges:{}", non_numeric));
        } else if values.iter().flatten().any(|&v| v < 0.0) {
            violations.push(Violation::Negative("TotalCharges".to_string()));
        }
    }

    fn check_total_vs_monthly(&self, df: &DataFrame, violations: &mut Vec<Violation>) {
        let (Some(total), Some(monthly)) = (series(df, "TotalCharges"), series(df, "MonthlyCharges"))
        else {
            return;
        };

        let pairs: Vec<(f64, f64)> = coerce_numeric(total)
            .into_iter()
            .zip(coerce_numeric(monthly))
            .filter_map(|(t, m)| Some((t?, m?)))
            .collect();

        if pairs.is_empty() {
            return;
        }

        let consistent = pairs.iter().filter(|(t, m)| t >= m).count();
        let proportion = consistent as f64 / pairs.len() as f64;
        if proportion < self.min_total_vs_monthly_ratio {
            violations.push(Violation::TotalVsMonthlyRatio(proportion));
        }
    }
}

/// Validate a raw Telco table with the default rule set
pub fn validate_telco_data(df: &DataFrame) -> ValidationReport {
    TelcoValidator::default().validate(df)
}
