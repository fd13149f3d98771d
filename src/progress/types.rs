use serde::Deserialize;

/// Identifies the set of files submitted together in one upload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressEntry {
    pub upload_progress: u8,
    pub processing_progress: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateProgress {
    pub upload: u8,
    pub processing: u8,
}

/// Summary row for a file whose server-side processing has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedFile {
    pub name: String,
    pub size: String,
}

/// One processing tick pushed by the server for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "Processed")]
    pub processed: u64,
    #[serde(rename = "TotalRecords")]
    pub total_records: u64,
}

impl ProgressEvent {
    /// Rounded processing percentage. An empty file counts as fully processed.
    pub fn percentage(&self) -> u8 {
        if self.total_records == 0 {
            return 100;
        }
        let ratio = self.processed as f64 * 100.0 / self.total_records as f64;
        ratio.round().clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(processed: u64, total_records: u64) -> ProgressEvent {
        ProgressEvent {
            file_name: "a.csv".to_string(),
            processed,
            total_records,
        }
    }

    #[test]
    fn decodes_server_payload() {
        let parsed: ProgressEvent =
            serde_json::from_str(r#"{"FileName":"a.csv","Processed":10,"TotalRecords":40}"#)
                .unwrap();
        assert_eq!(parsed, event(10, 40));
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(event(1, 8).percentage(), 13);
        assert_eq!(event(1, 3).percentage(), 33);
        assert_eq!(event(10, 10).percentage(), 100);
    }

    #[test]
    fn percentage_is_clamped_and_zero_total_is_done() {
        assert_eq!(event(15, 10).percentage(), 100);
        assert_eq!(event(0, 0).percentage(), 100);
    }
}
