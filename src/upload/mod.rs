mod types;
mod uploader;

pub use types::{validate_selection, SelectionError, UploadEvent};
pub use uploader::BatchUploader;
