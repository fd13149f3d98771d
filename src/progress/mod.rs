mod aggregate;
mod store;
mod types;

pub use store::ProgressStore;
pub use types::{BatchId, ProgressEvent};
