use billing_core::{Money, MonthPeriod};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::db::DbPool;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("summary unavailable: {0}")]
    Unavailable(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("database error: {0}")]
    Internal(#[from] sqlx::Error),
}

/// Parses a `YYYY-MM` month filter.
pub fn parse_month(raw: &str) -> Result<MonthPeriod, QueryError> {
    raw.trim()
        .parse()
        .map_err(|e| QueryError::InvalidRequest(format!("month '{raw}': {e}")))
}

/// Optional filters for [`SummaryReader::list`]. Creditor and status are
/// case-insensitive substring matches; blank strings are ignored.
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub creditor: Option<String>,
    pub status: Option<String>,
    pub month: Option<MonthPeriod>,
}

impl SummaryFilter {
    fn creditor_pattern(&self) -> Option<String> {
        like_pattern(self.creditor.as_deref())
    }

    fn status_pattern(&self) -> Option<String> {
        like_pattern(self.status.as_deref())
    }
}

/// Lower-cased substring pattern with `\`, `%` and `_` taken literally.
/// Pairs with `LIKE ? ESCAPE '\'`.
fn like_pattern(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(|v| {
        let mut pattern = String::with_capacity(v.len() + 2);
        pattern.push('%');
        for c in v.to_lowercase().chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self, QueryError> {
        if page == 0 {
            return Err(QueryError::InvalidRequest(format!("page must be >= 1, got {page}")));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(QueryError::InvalidRequest(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(self) -> u32 {
        self.page
    }

    pub fn page_size(self) -> u32 {
        self.page_size
    }

    fn offset(self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub month: String,
    pub creditor: String,
    pub status: String,
    pub record_count: i64,
    pub total_amount: f64,
    pub average_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryPage {
    pub rows: Vec<SummaryRow>,
    pub total_matching: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTotal {
    pub status: String,
    pub record_count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditorTotal {
    pub creditor: String,
    pub record_count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallTotals {
    pub record_count: i64,
    pub total_amount: f64,
    pub month_count: i64,
    pub creditor_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTotals {
    pub by_status: Vec<StatusTotal>,
    pub by_creditor: Vec<CreditorTotal>,
    pub overall: OverallTotals,
}

fn unreadable(path: &Path, e: sqlx::Error) -> QueryError {
    QueryError::Unavailable(format!("database {} cannot be opened: {e}", path.display()))
}

fn cents(value: f64) -> f64 {
    Money::from_f64(value).to_f64()
}

/// Read-only access to the persisted monthly summary.
#[derive(Debug, Clone)]
pub struct SummaryReader {
    pool: DbPool,
}

impl SummaryReader {
    /// Opens an existing summary database. A missing file, or one SQLite
    /// cannot read, is reported as [`QueryError::Unavailable`]; the file is
    /// never created here.
    pub async fn open(path: &Path) -> Result<Self, QueryError> {
        if !path.exists() {
            return Err(QueryError::Unavailable(format!(
                "database {} not found, run the pipeline first",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| unreadable(path, e))?;

        // Connecting is lazy about the file header; a first read is what
        // rejects a file that is not a database.
        sqlx::query("SELECT 1 FROM sqlite_master LIMIT 1")
            .fetch_optional(&pool)
            .await
            .map_err(|e| unreadable(path, e))?;

        Ok(Self { pool })
    }

    async fn ensure_table(&self) -> Result<(), QueryError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'monthly_summary'",
        )
        .fetch_optional(&self.pool)
        .await?;

        match found {
            Some(_) => Ok(()),
            None => Err(QueryError::Unavailable(
                "monthly_summary table not found, run the pipeline first".to_string(),
            )),
        }
    }

    /// One page of summary rows ordered by month, creditor and status.
    pub async fn list(
        &self,
        filter: &SummaryFilter,
        page: PageRequest,
    ) -> Result<SummaryPage, QueryError> {
        self.ensure_table().await?;

        let creditor = filter.creditor_pattern();
        let status = filter.status_pattern();
        let month = filter.month.map(|m| m.to_string());

        let mut conditions = String::from(" WHERE 1=1");
        if creditor.is_some() {
            conditions.push_str(" AND creditor_key LIKE ? ESCAPE '\\'");
        }
        if status.is_some() {
            conditions.push_str(" AND status_key LIKE ? ESCAPE '\\'");
        }
        if month.is_some() {
            conditions.push_str(" AND month = ?");
        }

        let count_sql = format!("SELECT COUNT(*) FROM monthly_summary{conditions}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in [&creditor, &status, &month].into_iter().flatten() {
            count_query = count_query.bind(value.as_str());
        }
        let total_matching = count_query.fetch_one(&self.pool).await?;

        let rows_sql = format!(
            "SELECT month, creditor, status, record_count, total_amount, average_amount \
             FROM monthly_summary{conditions} ORDER BY month, creditor, status LIMIT ? OFFSET ?"
        );
        let mut rows_query =
            sqlx::query_as::<_, (String, String, String, i64, f64, f64)>(&rows_sql);
        for value in [&creditor, &status, &month].into_iter().flatten() {
            rows_query = rows_query.bind(value.as_str());
        }
        let rows = rows_query
            .bind(page.page_size() as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(
                |(month, creditor, status, record_count, total_amount, average_amount)| SummaryRow {
                    month,
                    creditor,
                    status,
                    record_count,
                    total_amount,
                    average_amount,
                },
            )
            .collect::<Vec<_>>();

        let page_size = page.page_size() as i64;
        let total_pages = (total_matching + page_size - 1) / page_size;

        debug!(
            total_matching,
            returned = rows.len(),
            page = page.page(),
            "listed monthly summary"
        );

        Ok(SummaryPage {
            rows,
            total_matching,
            page: page.page(),
            page_size: page.page_size(),
            total_pages,
        })
    }

    /// Distinct months, most recent first.
    pub async fn months(&self) -> Result<Vec<MonthPeriod>, QueryError> {
        self.ensure_table().await?;
        let raw: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT month FROM monthly_summary ORDER BY month DESC")
                .fetch_all(&self.pool)
                .await?;

        // Rows are only written by the loader, so anything unparseable is a
        // corrupted table rather than a bad request.
        raw.iter()
            .map(|m| {
                m.parse::<MonthPeriod>().map_err(|e| {
                    QueryError::Internal(sqlx::Error::Decode(
                        format!("stored month '{m}': {e}").into(),
                    ))
                })
            })
            .collect()
    }

    /// Distinct creditors in ascending order.
    pub async fn creditors(&self) -> Result<Vec<String>, QueryError> {
        self.ensure_table().await?;
        let creditors =
            sqlx::query_scalar("SELECT DISTINCT creditor FROM monthly_summary ORDER BY creditor")
                .fetch_all(&self.pool)
                .await?;
        Ok(creditors)
    }

    pub async fn totals(&self) -> Result<SummaryTotals, QueryError> {
        self.ensure_table().await?;

        let by_status = sqlx::query_as::<_, (String, i64, f64)>(
            r#"
            SELECT status, SUM(record_count), COALESCE(SUM(total_amount), 0.0)
            FROM monthly_summary
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(status, record_count, total)| StatusTotal {
            status,
            record_count,
            total_amount: cents(total),
        })
        .collect();

        let by_creditor = sqlx::query_as::<_, (String, i64, f64)>(
            r#"
            SELECT creditor, SUM(record_count), COALESCE(SUM(total_amount), 0.0)
            FROM monthly_summary
            GROUP BY creditor
            ORDER BY creditor
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(creditor, record_count, total)| CreditorTotal {
            creditor,
            record_count,
            total_amount: cents(total),
        })
        .collect();

        let (record_count, total_amount, month_count, creditor_count) =
            sqlx::query_as::<_, (i64, f64, i64, i64)>(
                r#"
                SELECT
                    COALESCE(SUM(record_count), 0),
                    COALESCE(SUM(total_amount), 0.0),
                    COUNT(DISTINCT month),
                    COUNT(DISTINCT creditor)
                FROM monthly_summary
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(SummaryTotals {
            by_status,
            by_creditor,
            overall: OverallTotals {
                record_count,
                total_amount: cents(total_amount),
                month_count,
                creditor_count,
            },
        })
    }

    /// True when the summary table exists and answers a query.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1 FROM monthly_summary LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .is_ok()
    }
}
