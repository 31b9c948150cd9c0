pub mod aggregate;
pub mod config;
pub mod money;
pub mod period;
pub mod record;

pub use aggregate::{aggregate, MonthlyAggregate};
pub use config::NormalizationDefaults;
pub use money::{format_brazilian, parse_amount, Money};
pub use period::{MonthPeriod, PeriodError};
pub use record::{
    format_optional_date, BillingRecord, NormalizedRecord, TitleStatus,
    CANONICAL_HEADER,
};
