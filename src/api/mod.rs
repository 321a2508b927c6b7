//! Authenticated client for the dashboard REST API.
//!
//! Every request carries the stored Kakao access token as a bearer token.
//! Requests are refused locally once the stored expiration time has passed.

mod client;
mod operations;
mod types;

pub use client::DashboardClient;
pub use operations::{
    DailyOperation, LITRES_PER_UNIT, OperationHistory, OperationLogEntry, OperationTotals,
    parse_operation_log,
};
pub use types::{EnvironmentMetric, EnvironmentRecord, Machine, SeriesPoint, series};
