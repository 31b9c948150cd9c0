pub mod db;
pub mod query;

pub use db::{create_db, replace_monthly_summary, DbPool, StorageError};
pub use query::{
    parse_month, CreditorTotal, OverallTotals, PageRequest, QueryError, StatusTotal,
    SummaryFilter, SummaryPage, SummaryReader, SummaryRow, SummaryTotals, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
