//! # Event Table Loading and Validation
//!
//! Reads the resample-stacked event table from a delimited file and turns it into
//! the `EventRecord`s consumed by the estimator.
//!
//! - Strict schema: the columns `resample_index`, `subject_id`, `time`, `status`,
//!   `arm` and `weight` are required and matched case-insensitively. Extra columns
//!   are ignored.
//! - Tab-separated by default; a `.csv` extension switches to commas.
//! - Failures are assumed to be user-input errors and name the offending column,
//!   and the 1-based data row where one exists.

use crate::types::{Arm, EventRecord, EventStatus, ResampleIndex};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const RESAMPLE_COLUMN: &str = "resample_index";
const SUBJECT_COLUMN: &str = "subject_id";
const TIME_COLUMN: &str = "time";
const STATUS_COLUMN: &str = "status";
const ARM_COLUMN: &str = "arm";
const WEIGHT_COLUMN: &str = "weight";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("The required column '{0}' was not found in the input file.")]
    ColumnNotFound(String),
    #[error(
        "Column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error("Missing or null values were found in the column '{0}'.")]
    MissingValues(String),
    #[error("Row {row}: column '{column_name}' holds '{value}', expected {expected}.")]
    InvalidValue {
        column_name: String,
        row: usize,
        value: String,
        expected: &'static str,
    },
    #[error("The input file contains no data rows.")]
    Empty,
}

/// Loads the event table, keeping file order (which defines each subject's first
/// occurrence within a resample).
pub fn load_event_table(path: &str) -> Result<Vec<EventRecord>, DataError> {
    let df = read_tabular(path)?;
    if df.height() == 0 {
        return Err(DataError::Empty);
    }
    let name_map = build_case_insensitive_map(
        df.get_column_names()
            .into_iter()
            .map(|name| name.as_str().to_string()),
    );

    let resample = extract_non_negative_integers(&df, &name_map, RESAMPLE_COLUMN)?;
    let subject_id = extract_text_column(&df, &name_map, SUBJECT_COLUMN)?;
    let time = extract_non_negative_reals(&df, &name_map, TIME_COLUMN)?;
    let status = extract_status_column(&df, &name_map)?;
    let arm = extract_arm_column(&df, &name_map)?;
    let weight = extract_non_negative_reals(&df, &name_map, WEIGHT_COLUMN)?;

    let records = resample
        .into_iter()
        .zip(subject_id)
        .zip(time)
        .zip(status)
        .zip(arm)
        .zip(weight)
        .map(
            |(((((resample, subject_id), time), status), arm), weight)| EventRecord {
                resample: resample as ResampleIndex,
                subject_id,
                time,
                status,
                arm,
                weight,
            },
        )
        .collect::<Vec<_>>();

    log::info!("Loaded {} event records from {path}", records.len());
    Ok(records)
}

fn read_tabular(path: &str) -> Result<DataFrame, DataError> {
    let path = Path::new(path);
    let separator = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => b',',
        _ => b'\t',
    };
    let text_columns = text_column_schema(path, separator)?;
    let file = File::open(path)?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(text_columns)))
        .map_parse_options(|options| options.with_separator(separator))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(DataError::from)
}

/// Pins `subject_id` and `status` to text before parsing, so identifiers such as
/// `007` and `7` are never merged by integer inference.
fn text_column_schema(path: &Path, separator: u8) -> Result<Schema, DataError> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    let mut schema = Schema::default();
    for name in header
        .trim_end_matches(['\r', '\n'])
        .split(char::from(separator))
        .map(|name| name.trim_matches('"'))
    {
        let lowered = name.to_ascii_lowercase();
        if lowered == SUBJECT_COLUMN || lowered == STATUS_COLUMN {
            schema.with_column(name.into(), DataType::String);
        }
    }
    Ok(schema)
}

fn build_case_insensitive_map<I, S>(names: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut map = HashMap::new();
    for name in names {
        let original = name.as_ref().to_string();
        map.insert(original.to_ascii_lowercase(), original);
    }
    map
}

fn lookup<'a>(
    df: &'a DataFrame,
    map: &HashMap<String, String>,
    key: &str,
) -> Result<(&'a Column, String), DataError> {
    let actual = map
        .get(key)
        .ok_or_else(|| DataError::ColumnNotFound(key.to_string()))?;
    let column = df
        .column(actual)
        .map_err(|_| DataError::ColumnNotFound(actual.clone()))?;
    if column.null_count() > 0 {
        return Err(DataError::MissingValues(actual.clone()));
    }
    Ok((column, actual.clone()))
}

fn extract_f64_column(
    df: &DataFrame,
    map: &HashMap<String, String>,
    key: &str,
) -> Result<(Vec<f64>, String), DataError> {
    let (column, actual) = lookup(df, map, key)?;
    let dtype = column.dtype().clone();
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|_| DataError::ColumnWrongType {
            column_name: actual.clone(),
            expected_type: "float",
            found_type: dtype.to_string(),
        })?;
    let values = casted.f64()?;
    // Non-numeric text becomes null under a lenient cast.
    if values.null_count() > 0 {
        return Err(DataError::ColumnWrongType {
            column_name: actual,
            expected_type: "float",
            found_type: dtype.to_string(),
        });
    }
    Ok((values.into_no_null_iter().collect(), actual))
}

fn extract_non_negative_reals(
    df: &DataFrame,
    map: &HashMap<String, String>,
    key: &str,
) -> Result<Vec<f64>, DataError> {
    let (values, actual) = extract_f64_column(df, map, key)?;
    if let Some((row, value)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(DataError::InvalidValue {
            column_name: actual,
            row: row + 1,
            value: value.to_string(),
            expected: "a finite non-negative number",
        });
    }
    Ok(values)
}

fn extract_non_negative_integers(
    df: &DataFrame,
    map: &HashMap<String, String>,
    key: &str,
) -> Result<Vec<u32>, DataError> {
    let (values, actual) = extract_f64_column(df, map, key)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            if value.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&value) {
                Ok(value as u32)
            } else {
                Err(DataError::InvalidValue {
                    column_name: actual.clone(),
                    row: row + 1,
                    value: value.to_string(),
                    expected: "a non-negative integer",
                })
            }
        })
        .collect()
}

fn extract_text_column(
    df: &DataFrame,
    map: &HashMap<String, String>,
    key: &str,
) -> Result<Vec<String>, DataError> {
    let (column, actual) = lookup(df, map, key)?;
    let dtype = column.dtype().clone();
    let casted = column
        .cast(&DataType::String)
        .map_err(|_| DataError::ColumnWrongType {
            column_name: actual.clone(),
            expected_type: "text",
            found_type: dtype.to_string(),
        })?;
    let values = casted.str()?;
    if values.null_count() > 0 {
        return Err(DataError::MissingValues(actual));
    }
    Ok(values
        .into_no_null_iter()
        .map(|value| value.to_string())
        .collect())
}

fn extract_status_column(
    df: &DataFrame,
    map: &HashMap<String, String>,
) -> Result<Vec<EventStatus>, DataError> {
    let labels = extract_text_column(df, map, STATUS_COLUMN)?;
    let actual = map
        .get(STATUS_COLUMN)
        .cloned()
        .unwrap_or_else(|| STATUS_COLUMN.to_string());
    labels
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            status_from_text(&label).ok_or_else(|| DataError::InvalidValue {
                column_name: actual.clone(),
                row: row + 1,
                value: label,
                expected: "0/censored, 1/event or 2/competing",
            })
        })
        .collect()
}

/// Accepts labels, integer codes, and integer codes rendered from a float column.
fn status_from_text(text: &str) -> Option<EventStatus> {
    EventStatus::from_label(text).or_else(|| {
        let value = text.trim().parse::<f64>().ok()?;
        if value.fract() == 0.0 {
            EventStatus::from_code(value as i64)
        } else {
            None
        }
    })
}

fn extract_arm_column(
    df: &DataFrame,
    map: &HashMap<String, String>,
) -> Result<Vec<Arm>, DataError> {
    let (values, actual) = extract_f64_column(df, map, ARM_COLUMN)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let arm = if value.fract() == 0.0 {
                Arm::from_code(value as i64)
            } else {
                None
            };
            arm.ok_or_else(|| DataError::InvalidValue {
                column_name: actual.clone(),
                row: row + 1,
                value: value.to_string(),
                expected: "arm code 0 or 1",
            })
        })
        .collect()
}
