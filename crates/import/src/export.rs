use std::fs;
use std::io::Write;
use std::path::Path;

use billing_core::{format_optional_date, MonthlyAggregate, NormalizedRecord, CANONICAL_HEADER};
use thiserror::Error;
use tracing::info;

pub const SUMMARY_HEADER: [&str; 6] = [
    "MES_ANO",
    "CREDOR",
    "STATUS_TITULO",
    "QUANTIDADE",
    "VALOR_TOTAL",
    "VALOR_MEDIO",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Writes the normalized records with amounts in Brazilian notation. The
/// output is meant for people to inspect; it is never read back.
pub fn write_normalized<W: Write>(out: W, records: &[NormalizedRecord]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CANONICAL_HEADER)?;

    for r in records {
        let registration = format_optional_date(r.registration_date);
        let payment = format_optional_date(r.payment_date);
        let amount = r.amount.to_brazilian();
        writer.write_record([
            r.creditor.as_str(),
            r.campaign.as_str(),
            r.client.as_str(),
            registration.as_str(),
            payment.as_str(),
            r.status.label(),
            amount.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_summary<W: Write>(out: W, rows: &[MonthlyAggregate]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(SUMMARY_HEADER)?;

    for row in rows {
        writer.write_record([
            row.month.to_string(),
            row.creditor.clone(),
            row.status.label().to_string(),
            row.record_count.to_string(),
            row.total_amount.to_brazilian(),
            row.average_amount.to_brazilian(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_normalized_file(path: &Path, records: &[NormalizedRecord]) -> Result<(), ExportError> {
    let file = create_file(path)?;
    write_normalized(file, records)?;
    info!(path = %path.display(), records = records.len(), "wrote normalized export");
    Ok(())
}

pub fn write_summary_file(path: &Path, rows: &[MonthlyAggregate]) -> Result<(), ExportError> {
    let file = create_file(path)?;
    write_summary(file, rows)?;
    info!(path = %path.display(), rows = rows.len(), "wrote summary export");
    Ok(())
}

fn create_file(path: &Path) -> Result<fs::File, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::File::create(path)?)
}
