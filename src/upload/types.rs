use crate::progress::BatchId;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A file picked by the user, not yet submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl SelectedFile {
    pub fn from_path(path: &Path) -> Result<Self, SelectionError> {
        let name = file_name(path);
        let metadata = fs::metadata(path).map_err(|source| SelectionError::Unreadable {
            name: name.clone(),
            source,
        })?;

        Ok(Self {
            name,
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }
}

/// Updates sent back from an upload worker.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Progress { batch: BatchId, percent: u8 },
    Finished { batch: BatchId },
    Failed { batch: BatchId, error: String },
}

#[derive(Debug)]
pub enum SelectionError {
    NotCsv(Vec<String>),
    Unreadable { name: String, source: io::Error },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::NotCsv(_) => write!(f, "Only CSV files are allowed!"),
            SelectionError::Unreadable { name, source } => {
                write!(f, "Could not read {}: {}", name, source)
            }
        }
    }
}

impl StdError for SelectionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SelectionError::NotCsv(_) => None,
            SelectionError::Unreadable { source, .. } => Some(source),
        }
    }
}

pub fn is_csv(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

/// Accepts the whole selection or none of it.
pub fn validate_selection(paths: &[PathBuf]) -> Result<Vec<SelectedFile>, SelectionError> {
    let rejected: Vec<String> = paths
        .iter()
        .map(|p| file_name(p))
        .filter(|name| !is_csv(name))
        .collect();

    if !rejected.is_empty() {
        return Err(SelectionError::NotCsv(rejected));
    }

    paths.iter().map(|p| SelectedFile::from_path(p)).collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
