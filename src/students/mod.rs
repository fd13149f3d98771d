mod client;
mod query;
mod types;

pub use client::{StudentsClient, StudentsFetcher};
pub use query::{numeric_filter, QueryState};
pub use types::{SortColumn, SortOrder, StudentPage, StudentRecord};
