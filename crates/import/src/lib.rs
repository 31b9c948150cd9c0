pub mod export;
pub mod normalize;
pub mod reconstruct;
pub(crate) mod util;

pub use export::{
    write_normalized, write_normalized_file, write_summary, write_summary_file, ExportError,
    SUMMARY_HEADER,
};
pub use normalize::{normalize_date, normalize_status, FieldNormalizer};
pub use reconstruct::{read_source, reconstruct, reconstruct_str, ImportError, Reconstruction, MIN_FIELDS};
