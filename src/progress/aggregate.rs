use super::types::{AggregateProgress, ProgressEntry};
use std::collections::HashMap;

/// Reduces the per-file progress map into overall upload/processing percentages.
///
/// Upload reports 100 only once every entry has finished uploading; otherwise
/// both figures are the rounded mean over all entries.
pub fn calculate(entries: &HashMap<String, ProgressEntry>) -> AggregateProgress {
    if entries.is_empty() {
        return AggregateProgress::default();
    }

    let count = entries.len() as f64;
    let all_uploaded = entries.values().all(|e| e.upload_progress == 100);

    let upload = if all_uploaded {
        100
    } else {
        let sum: u64 = entries.values().map(|e| e.upload_progress as u64).sum();
        mean(sum, count)
    };

    let processing_sum: u64 = entries
        .values()
        .map(|e| e.processing_progress as u64)
        .sum();

    AggregateProgress {
        upload,
        processing: mean(processing_sum, count),
    }
}

fn mean(sum: u64, count: f64) -> u8 {
    (sum as f64 / count).round().clamp(0.0, 100.0) as u8
}
