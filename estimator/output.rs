//! Tab-separated writers for the final estimate table and the replicate curves.

use crate::bootstrap::Metric;
use crate::contrast::ContrastCurve;
use crate::interval::FinalEstimate;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write delimited output: {0}")]
    Csv(#[from] csv::Error),
}

/// Controls the optional columns of the estimate table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableOptions {
    /// Append one `se_<metric>` column per metric after the fixed columns.
    pub include_standard_errors: bool,
}

fn estimate_header(options: TableOptions) -> Vec<String> {
    let mut header = vec!["time".to_string()];
    for metric in Metric::ALL {
        let name = metric.column_name();
        header.push(name.to_string());
        header.push(format!("{name}_LCL"));
        header.push(format!("{name}_UCL"));
    }
    if options.include_standard_errors {
        header.extend(Metric::ALL.iter().map(|m| format!("se_{}", m.column_name())));
    }
    header
}

/// Writes one row per grid time to any writer.
pub fn write_estimates<W: Write>(
    writer: W,
    estimates: &[FinalEstimate],
    options: TableOptions,
) -> Result<(), OutputError> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    out.write_record(estimate_header(options))?;

    let mut record: Vec<String> = Vec::with_capacity(17);
    for row in estimates {
        record.clear();
        record.push(row.time.to_string());
        for metric in Metric::ALL {
            let interval = row.interval(metric);
            record.push(interval.estimate.to_string());
            record.push(interval.lower.to_string());
            record.push(interval.upper.to_string());
        }
        if options.include_standard_errors {
            record.extend(
                Metric::ALL
                    .iter()
                    .map(|&m| row.interval(m).standard_error.to_string()),
            );
        }
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

pub fn save_estimates(
    path: &Path,
    estimates: &[FinalEstimate],
    options: TableOptions,
) -> Result<(), OutputError> {
    let file = std::fs::File::create(path)?;
    write_estimates(std::io::BufWriter::new(file), estimates, options)
}

/// Writes every supplied contrast curve in long format, one row per (resample, time).
pub fn write_replicates<'a, W, I>(writer: W, curves: I) -> Result<(), OutputError>
where
    W: Write,
    I: IntoIterator<Item = &'a ContrastCurve>,
{
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    let mut header = vec!["resample_index", "time"];
    header.extend(Metric::ALL.iter().map(|m| m.column_name()));
    out.write_record(&header)?;

    for curve in curves {
        for point in &curve.points {
            let mut record = vec![curve.resample.to_string(), point.time.to_string()];
            record.extend(Metric::ALL.iter().map(|&m| m.of(point).to_string()));
            out.write_record(&record)?;
        }
    }
    out.flush()?;
    Ok(())
}

pub fn save_replicates<'a, I>(path: &Path, curves: I) -> Result<(), OutputError>
where
    I: IntoIterator<Item = &'a ContrastCurve>,
{
    let file = std::fs::File::create(path)?;
    write_replicates(std::io::BufWriter::new(file), curves)
}
