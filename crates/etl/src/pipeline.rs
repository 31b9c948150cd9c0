use std::path::PathBuf;

use billing_core::{aggregate, MonthlyAggregate, NormalizationDefaults, NormalizedRecord};
use billing_import::{
    read_source, reconstruct_str, write_normalized_file, write_summary_file, ExportError,
    FieldNormalizer, ImportError,
};
use billing_storage::{create_db, replace_monthly_summary, StorageError};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PipelineConfig;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("loading the summary table failed: {0}")]
    Persistence(#[from] StorageError),
}

/// Records and aggregates derived from one raw export, before anything is
/// written out.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub records: Vec<NormalizedRecord>,
    pub aggregates: Vec<MonthlyAggregate>,
    pub lines_read: usize,
    pub blank_lines: usize,
    pub malformed_lines: Vec<usize>,
}

impl Transformed {
    pub fn undated_records(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.registration_date.is_none())
            .count()
    }
}

/// Reconstruct, normalize and aggregate the raw export text.
pub fn transform(content: &str, defaults: &NormalizationDefaults) -> Result<Transformed, ImportError> {
    let reconstruction = reconstruct_str(content)?;

    let normalizer = FieldNormalizer::new(defaults.clone());
    let records = normalizer.normalize_all(&reconstruction.records);
    info!(records = records.len(), "normalized records");

    let aggregates = aggregate(&records);
    info!(groups = aggregates.len(), "aggregated monthly summary");

    Ok(Transformed {
        records,
        aggregates,
        lines_read: reconstruction.lines_read,
        blank_lines: reconstruction.blank_lines,
        malformed_lines: reconstruction.malformed_lines,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub lines_read: usize,
    pub blank_lines: usize,
    pub records_reconstructed: usize,
    pub malformed_dropped: usize,
    pub records_without_registration_date: usize,
    pub aggregates: usize,
    pub rows_loaded: u64,
    pub normalized_export: PathBuf,
    pub summary_export: PathBuf,
    pub database: PathBuf,
}

/// Runs every stage in order: read, reconstruct, normalize, export the
/// normalized records, aggregate, export the summary, load the table.
///
/// Nothing is written when the source is missing or has no header. Runs
/// must not overlap.
pub async fn run(config: &PipelineConfig) -> Result<RunReport, PipelineError> {
    info!(input = %config.input.display(), "starting billing pipeline");

    let content = read_source(&config.input)?;
    let transformed = transform(&content, &config.defaults)?;

    if !transformed.malformed_lines.is_empty() {
        warn!(
            dropped = transformed.malformed_lines.len(),
            "dropped malformed lines"
        );
    }

    write_normalized_file(&config.normalized_export, &transformed.records)?;
    write_summary_file(&config.summary_export, &transformed.aggregates)?;

    let pool = create_db(&config.database).await?;
    let rows_loaded = replace_monthly_summary(&pool, &transformed.aggregates).await;
    pool.close().await;
    let rows_loaded = rows_loaded?;

    let report = RunReport {
        lines_read: transformed.lines_read,
        blank_lines: transformed.blank_lines,
        records_reconstructed: transformed.records.len(),
        malformed_dropped: transformed.malformed_lines.len(),
        records_without_registration_date: transformed.undated_records(),
        aggregates: transformed.aggregates.len(),
        rows_loaded,
        normalized_export: config.normalized_export.clone(),
        summary_export: config.summary_export.clone(),
        database: config.database.clone(),
    };

    info!(
        records = report.records_reconstructed,
        dropped = report.malformed_dropped,
        undated = report.records_without_registration_date,
        rows = report.rows_loaded,
        "billing pipeline finished"
    );
    Ok(report)
}
