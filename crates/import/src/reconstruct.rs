use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use billing_core::{BillingRecord, CANONICAL_HEADER};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

/// Lines splitting into fewer fields than this are dropped.
pub const MIN_FIELDS: usize = 6;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Source file not found: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Schema violation: {0}")]
    SchemaViolation(String),
}

/// Output of a reconstruction pass. Dropped lines are reported, not raised.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub records: Vec<BillingRecord>,
    pub lines_read: usize,
    pub blank_lines: usize,
    /// Zero-based indices of lines with fewer than [`MIN_FIELDS`] fields.
    pub malformed_lines: Vec<usize>,
}

fn re_split_thousands() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(\d),(\d{3}\.\d+)").expect("invalid regex"))
}

/// Reads the raw export. A missing file is reported as
/// [`ImportError::SourceMissing`] so callers can tell it from other I/O faults.
pub fn read_source(path: &Path) -> Result<String, ImportError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(ImportError::SourceMissing(path.to_path_buf()))
        }
        Err(e) => Err(ImportError::Io(e)),
    }
}

/// Rebuilds field tuples from a corrupted delimited export.
///
/// Line 0 is the header and is discarded in favour of [`CANONICAL_HEADER`].
/// Commas and semicolons both delimit fields, after the `1,234.56` style
/// thousands comma has been stitched back together. Surplus fields past the
/// seventh belong to the amount, whose decimal comma was taken for a
/// delimiter.
pub fn reconstruct<I, S>(lines: I) -> Result<Reconstruction, ImportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut lines = lines.into_iter();
    let header = lines
        .next()
        .ok_or_else(|| ImportError::SchemaViolation("input has no header line".to_string()))?;
    check_header(header.as_ref())?;

    let mut out = Reconstruction {
        lines_read: 1,
        ..Default::default()
    };

    for (offset, raw) in lines.enumerate() {
        let index = offset + 1;
        out.lines_read += 1;

        let line = raw.as_ref().trim();
        if line.is_empty() {
            out.blank_lines += 1;
            continue;
        }

        match split_line(index, line) {
            Some(record) => out.records.push(record),
            None => {
                debug!(line = index, "dropping malformed line");
                out.malformed_lines.push(index);
            }
        }
    }

    info!(
        lines = out.lines_read,
        records = out.records.len(),
        malformed = out.malformed_lines.len(),
        "reconstructed billing export"
    );
    Ok(out)
}

pub fn reconstruct_str(content: &str) -> Result<Reconstruction, ImportError> {
    reconstruct(content.lines())
}

fn check_header(line: &str) -> Result<(), ImportError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ImportError::SchemaViolation(
            "header line is blank".to_string(),
        ));
    }
    let repaired = line.replace("C#EDOR", "CREDOR");
    if !repaired.eq_ignore_ascii_case(&CANONICAL_HEADER.join(",")) {
        debug!(header = %repaired, "replacing non-canonical header");
    }
    Ok(())
}

fn split_line(index: usize, line: &str) -> Option<BillingRecord> {
    let repaired = re_split_thousands().replace_all(line, "${1}${2}");
    let fields: Vec<&str> = repaired.split([',', ';']).map(str::trim).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let field = |i: usize| fields.get(i).copied().unwrap_or_default();
    let amount = match fields.get(6..) {
        Some(rest) if rest.len() > 1 => {
            let end = rest.iter().rposition(|f| !f.is_empty()).map_or(0, |p| p + 1);
            rest[..end].join(",")
        }
        _ => field(6).to_string(),
    };

    Some(BillingRecord {
        line: index,
        creditor: field(0).to_lowercase(),
        campaign: field(1).to_lowercase(),
        client: field(2).to_string(),
        registration_date: field(3).to_string(),
        payment_date: field(4).to_string(),
        status: field(5).to_lowercase(),
        amount,
    })
}
