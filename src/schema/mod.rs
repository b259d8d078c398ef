pub mod columns;
pub mod types;

pub use columns::{report_column_names, strip_namespace, TRAILER};
pub use types::{
    Account, ColumnHeader, NormalizedRow, Profile, ProfileInfo, QueryEcho, ReportPayload,
    ReportQuery, ResultTable,
};
