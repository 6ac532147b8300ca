//! Pipeline check harness
//!
//! Runs a suite of named checks over the pipeline stages and records one
//! outcome line per check. A failing or panicking check never stops the
//! suite; the remaining checks still run and the log reports every result.
//!
//! Outcomes distinguish assertion failures ([`ChurnError::CheckFailed`],
//! logged FAIL) from unexpected errors and panics (logged ERROR).

use crate::config::{
    ForestParamGrid, CATEGORICAL_COLUMNS, KEEP_COLUMNS, LABEL_COLUMN, TEST_FRACTION,
};
use crate::error::{ChurnError, Result};
use crate::{data, eda, encoding, features, train};
use chrono::Local;
use polars::prelude::*;
use std::fmt;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tempfile::TempDir;
use tracing::{error, info, warn};

/// Result of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "PASS"),
            Outcome::Fail => write!(f, "FAIL"),
            Outcome::Error => write!(f, "ERROR"),
        }
    }
}

/// One executed check with its outcome and optional detail message.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub outcome: Outcome,
    pub detail: Option<String>,
}

/// Collects check results and renders the run log.
#[derive(Debug, Default)]
pub struct Harness {
    results: Vec<CheckResult>,
    lines: Vec<String>,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one named check. Panics are caught and recorded as ERROR, so a
    /// broken check cannot abort the suite.
    pub fn run<F>(&mut self, name: &str, check: F) -> Outcome
    where
        F: FnOnce() -> Result<()>,
    {
        self.log_line(format!("RUN  {}", name));

        let (outcome, detail) = match catch_unwind(AssertUnwindSafe(check)) {
            Ok(Ok(())) => (Outcome::Pass, None),
            Ok(Err(ChurnError::CheckFailed(msg))) => (Outcome::Fail, Some(msg)),
            Ok(Err(e)) => (Outcome::Error, Some(e.to_string())),
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panicked".to_string());
                (Outcome::Error, Some(msg))
            }
        };

        match (&outcome, &detail) {
            (Outcome::Pass, _) => {
                info!(check = name, "check passed");
                self.log_line(format!("{} {}", Outcome::Pass, name));
            }
            (Outcome::Fail, Some(msg)) => {
                warn!(check = name, reason = %msg, "check failed");
                self.log_line(format!("{} {}: {}", Outcome::Fail, name, msg));
            }
            (_, Some(msg)) => {
                error!(check = name, reason = %msg, "check errored");
                self.log_line(format!("{} {}: {}", Outcome::Error, name, msg));
            }
            _ => {}
        }

        self.results.push(CheckResult {
            name: name.to_string(),
            outcome,
            detail,
        });
        outcome
    }

    fn log_line(&mut self, message: String) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.lines.push(format!("{} {}", stamp, message));
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.outcome == Outcome::Pass)
    }

    fn counts(&self) -> (usize, usize, usize) {
        let mut passed = 0;
        let mut failed = 0;
        let mut errored = 0;
        for r in &self.results {
            match r.outcome {
                Outcome::Pass => passed += 1,
                Outcome::Fail => failed += 1,
                Outcome::Error => errored += 1,
            }
        }
        (passed, failed, errored)
    }

    /// Append the summary line and write the full log to `path`.
    pub fn write_log(&mut self, path: &Path) -> Result<()> {
        let (passed, failed, errored) = self.counts();
        self.log_line(format!(
            "SUMMARY {} passed, {} failed, {} errored",
            passed, failed, errored
        ));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.lines.join("\n") + "\n")?;
        info!(path = %path.display(), passed, failed, errored, "check log written");
        Ok(())
    }
}

/// Assert a condition inside a check; a false condition is a FAIL, not an
/// ERROR.
pub fn ensure(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ChurnError::CheckFailed(message.to_string()))
    }
}

/// Deterministic synthetic frame with the full input schema and a 30%
/// churn rate, used by the default suite so it never depends on the real
/// dataset being present.
pub fn synthetic_bank_frame(n: usize) -> Result<DataFrame> {
    let status: Vec<&str> = (0..n)
        .map(|i| {
            if i % 10 < 3 {
                "Attrited Customer"
            } else {
                "Existing Customer"
            }
        })
        .collect();
    let gender: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "M" } else { "F" }).collect();
    let education: Vec<&str> = (0..n)
        .map(|i| match i % 3 {
            0 => "High School",
            1 => "Graduate",
            _ => "Uneducated",
        })
        .collect();
    let marital: Vec<&str> = (0..n)
        .map(|i| match i % 3 {
            0 => "Married",
            1 => "Single",
            _ => "Divorced",
        })
        .collect();
    let income: Vec<&str> = (0..n)
        .map(|i| match i % 4 {
            0 => "Less than $40K",
            1 => "$40K - $60K",
            2 => "$60K - $80K",
            _ => "$80K - $120K",
        })
        .collect();
    let card: Vec<&str> = (0..n)
        .map(|i| if i % 5 == 0 { "Silver" } else { "Blue" })
        .collect();

    let df = df!(
        "Attrition_Flag" => status,
        "Customer_Age" => (0..n).map(|i| 26 + (i % 42) as i64).collect::<Vec<i64>>(),
        "Dependent_count" => (0..n).map(|i| (i % 5) as i64).collect::<Vec<i64>>(),
        "Months_on_book" => (0..n).map(|i| 13 + (i % 43) as i64).collect::<Vec<i64>>(),
        "Total_Relationship_Count" => (0..n).map(|i| 1 + (i % 6) as i64).collect::<Vec<i64>>(),
        "Months_Inactive_12_mon" => (0..n).map(|i| (i % 7) as i64).collect::<Vec<i64>>(),
        "Contacts_Count_12_mon" => (0..n).map(|i| (i % 6) as i64).collect::<Vec<i64>>(),
        "Credit_Limit" => (0..n).map(|i| 1438.0 + (i * 733 % 30000) as f64).collect::<Vec<f64>>(),
        "Total_Revolving_Bal" => (0..n).map(|i| (i * 97 % 2517) as f64).collect::<Vec<f64>>(),
        "Avg_Open_To_Buy" => (0..n).map(|i| 500.0 + (i * 523 % 25000) as f64).collect::<Vec<f64>>(),
        "Total_Amt_Chng_Q4_Q1" => (0..n).map(|i| 0.5 + (i % 17) as f64 * 0.1).collect::<Vec<f64>>(),
        "Total_Trans_Amt" => (0..n).map(|i| 510.0 + (i * 311 % 17000) as f64).collect::<Vec<f64>>(),
        "Total_Trans_Ct" => (0..n).map(|i| 10 + (i * 7 % 130) as i64).collect::<Vec<i64>>(),
        "Total_Ct_Chng_Q4_Q1" => (0..n).map(|i| 0.3 + (i % 23) as f64 * 0.1).collect::<Vec<f64>>(),
        "Avg_Utilization_Ratio" => (0..n).map(|i| (i % 100) as f64 / 100.0).collect::<Vec<f64>>(),
        "Gender" => gender,
        "Education_Level" => education,
        "Marital_Status" => marital,
        "Income_Category" => income,
        "Card_Category" => card,
    )
    .map_err(|e| ChurnError::Data(e.to_string()))?;

    Ok(df)
}

/// Run the default check suite against a synthetic dataset and write the
/// log to `log_path`. Returns the harness so callers can inspect outcomes.
pub fn run_default_suite(log_path: &Path) -> Result<Harness> {
    let mut harness = Harness::new();

    harness.run("check_load_dataset", || {
        let dir = TempDir::new()?;
        let csv_path = dir.path().join("bank_data.csv");
        write_frame_csv(&mut synthetic_bank_frame(40)?, &csv_path)?;

        let df = data::load_dataset(&csv_path)?;
        ensure(df.height() == 40, "loaded frame has wrong row count")?;
        ensure(df.width() > 0, "loaded frame has no columns")?;
        ensure(
            data::load_dataset(&dir.path().join("missing.csv")).is_err(),
            "missing file should not load",
        )
    });

    harness.run("check_perform_eda", || {
        let dir = TempDir::new()?;
        let df = data::derive_label(synthetic_bank_frame(40)?)?;
        eda::perform_eda(&df, dir.path())?;

        let images = fs::read_dir(dir.path())?.count();
        ensure(images >= 5, "expected at least five EDA images")
    });

    harness.run("check_encode_categoricals", || {
        let df = data::derive_label(synthetic_bank_frame(40)?)?;
        let encoded = encoding::encode_categoricals(&df, &CATEGORICAL_COLUMNS, LABEL_COLUMN)?;

        for cat in CATEGORICAL_COLUMNS {
            let name = format!("{}_{}", cat, LABEL_COLUMN);
            ensure(
                encoded.column(&name).is_ok(),
                &format!("missing encoded column {}", name),
            )?;
        }

        let means = encoded
            .column("Gender_Churn")
            .map_err(|e| ChurnError::Data(e.to_string()))?
            .f64()
            .map_err(|e| ChurnError::Data(e.to_string()))?;
        let in_unit = means.into_iter().flatten().all(|v| (0.0..=1.0).contains(&v));
        ensure(in_unit, "encoded means must lie in [0, 1]")
    });

    harness.run("check_build_features", || {
        let df = data::derive_label(synthetic_bank_frame(40)?)?;
        let encoded = encoding::encode_categoricals(&df, &CATEGORICAL_COLUMNS, LABEL_COLUMN)?;
        let (x, y, names) = features::build_features(&encoded, &KEEP_COLUMNS, LABEL_COLUMN)?;

        ensure(x.ncols() == KEEP_COLUMNS.len(), "feature matrix width mismatch")?;
        ensure(names.len() == KEEP_COLUMNS.len(), "feature name count mismatch")?;

        let split = features::train_test_split(&x, &y, TEST_FRACTION, 42)?;
        let expected_test = ((x.nrows() as f64) * TEST_FRACTION).ceil() as usize;
        ensure(split.x_test.nrows() == expected_test, "test partition size mismatch")?;
        ensure(
            split.x_train.nrows() + split.x_test.nrows() == x.nrows(),
            "partitions must cover all rows",
        )
    });

    harness.run("check_train_models", || {
        let dir = TempDir::new()?;
        let df = data::derive_label(synthetic_bank_frame(40)?)?;
        let encoded = encoding::encode_categoricals(&df, &CATEGORICAL_COLUMNS, LABEL_COLUMN)?;
        let (x, y, _) = features::build_features(&encoded, &KEEP_COLUMNS, LABEL_COLUMN)?;
        let split = features::train_test_split(&x, &y, TEST_FRACTION, 42)?;

        train::train_models(&split, &ForestParamGrid::small(), 3, 42, dir.path())?;

        for name in [train::LOGISTIC_MODEL_FILE, train::FOREST_MODEL_FILE] {
            let path = dir.path().join(name);
            ensure(path.exists(), &format!("missing artifact {}", name))?;
            ensure(
                fs::metadata(&path)?.len() > 0,
                &format!("empty artifact {}", name),
            )?;
        }
        Ok(())
    });

    harness.write_log(log_path)?;
    Ok(harness)
}

fn write_frame_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| ChurnError::Data(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_fail_error_outcomes() {
        let mut harness = Harness::new();

        assert_eq!(harness.run("passes", || Ok(())), Outcome::Pass);
        assert_eq!(
            harness.run("fails", || ensure(false, "nope")),
            Outcome::Fail
        );
        assert_eq!(
            harness.run("errors", || Err(ChurnError::Data("broken".to_string()))),
            Outcome::Error
        );

        assert_eq!(harness.results().len(), 3);
        assert!(!harness.all_passed());
    }

    #[test]
    fn test_panic_recorded_as_error() {
        let mut harness = Harness::new();
        let outcome = harness.run("panics", || panic!("boom"));

        assert_eq!(outcome, Outcome::Error);
        assert_eq!(harness.results()[0].detail.as_deref(), Some("boom"));
    }

    #[test]
    fn test_suite_continues_after_failure() {
        let mut harness = Harness::new();
        harness.run("first", || ensure(false, "deliberate"));
        harness.run("second", || Ok(()));

        assert_eq!(harness.results()[0].outcome, Outcome::Fail);
        assert_eq!(harness.results()[1].outcome, Outcome::Pass);
    }

    #[test]
    fn test_log_has_line_per_check_and_summary() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("logs/checks.log");

        let mut harness = Harness::new();
        harness.run("alpha", || Ok(()));
        harness.run("beta", || ensure(false, "broken invariant"));
        harness.write_log(&log_path).unwrap();

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("PASS alpha"));
        assert!(log.contains("FAIL beta: broken invariant"));
        assert!(log.contains("SUMMARY 1 passed, 1 failed, 0 errored"));
    }

    #[test]
    fn test_synthetic_frame_has_full_schema() {
        let df = synthetic_bank_frame(10).unwrap();
        assert_eq!(df.height(), 10);
        for col in CATEGORICAL_COLUMNS {
            assert!(df.column(col).is_ok(), "missing {}", col);
        }
        assert!(df.column("Attrition_Flag").is_ok());
        assert!(df.column("Customer_Age").is_ok());
    }

    #[test]
    fn test_default_suite_all_pass() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("churn_tests.log");

        let harness = run_default_suite(&log_path).unwrap();
        assert!(harness.all_passed(), "results: {:?}", harness.results());
        assert!(log_path.exists());
    }
}
