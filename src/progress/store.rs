use super::aggregate;
use super::types::{
    AggregateProgress, BatchId, CompletedFile, ProgressEntry, ProgressEvent, UploadedFile,
};
use crate::utils::file_size::format_size;
use std::collections::HashMap;

/// Keyed record store shared by the upload and processing writers.
///
/// The upload side only ever writes `upload_progress`, the push stream only
/// `processing_progress`. Both are applied on the UI thread, one event at a
/// time, and the aggregate is recomputed after each mutation.
#[derive(Debug, Default)]
pub struct ProgressStore {
    files: Vec<UploadedFile>,
    entries: HashMap<String, ProgressEntry>,
    batches: HashMap<BatchId, Vec<String>>,
    completed: Vec<CompletedFile>,
    totals: AggregateProgress,
    next_batch: u64,
    revision: u64,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn entry(&self, name: &str) -> Option<&ProgressEntry> {
        self.entries.get(name)
    }

    pub fn totals(&self) -> AggregateProgress {
        self.totals
    }

    pub fn completed(&self) -> &[CompletedFile] {
        &self.completed
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Bumped whenever the tracked file list changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Starts tracking a freshly selected batch with zeroed progress.
    ///
    /// A name that is already tracked is replaced rather than duplicated.
    pub fn track_batch<I>(&mut self, files: I) -> BatchId
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let batch = BatchId(self.next_batch);
        self.next_batch += 1;

        let mut names = Vec::new();
        for (name, size) in files {
            let file = UploadedFile {
                name: name.clone(),
                size,
                completed: false,
            };
            match self.files.iter_mut().find(|f| f.name == name) {
                Some(existing) => *existing = file,
                None => self.files.push(file),
            }
            self.entries.insert(name.clone(), ProgressEntry::default());
            names.push(name);
        }

        log::debug!("Tracking batch {:?}: {:?}", batch, names);
        self.batches.insert(batch, names);
        self.revision += 1;
        self.refresh_totals();
        batch
    }

    /// Applies one transport tick uniformly to every file of the batch.
    pub fn set_batch_upload_progress(&mut self, batch: BatchId, percent: u8) {
        let percent = percent.min(100);
        let Some(names) = self.batches.get(&batch) else {
            return;
        };
        for name in names {
            if let Some(entry) = self.entries.get_mut(name) {
                entry.upload_progress = percent;
            }
        }
        self.refresh_totals();
    }

    pub fn finish_batch_upload(&mut self, batch: BatchId) {
        self.set_batch_upload_progress(batch, 100);
        self.batches.remove(&batch);
    }

    /// Drops every file of a failed batch from tracking. Returns the removed names.
    pub fn rollback_batch(&mut self, batch: BatchId) -> Vec<String> {
        let Some(names) = self.batches.remove(&batch) else {
            return Vec::new();
        };

        self.files.retain(|f| !names.contains(&f.name));
        for name in &names {
            self.entries.remove(name);
        }

        self.revision += 1;
        self.refresh_totals();
        names
    }

    /// Records a processing tick. Returns the summary row when this tick
    /// completes the file.
    pub fn apply_processing(&mut self, event: &ProgressEvent) -> Option<CompletedFile> {
        let Some(file) = self.files.iter_mut().find(|f| f.name == event.file_name) else {
            log::debug!("Ignoring progress for untracked file {}", event.file_name);
            return None;
        };

        let percent = event.percentage();
        let entry = self
            .entries
            .entry(event.file_name.clone())
            .or_insert(ProgressEntry {
                upload_progress: 100,
                processing_progress: 0,
            });
        entry.processing_progress = percent;

        let mut finished = None;
        if percent == 100 && !file.completed {
            file.completed = true;
            let summary = CompletedFile {
                name: file.name.clone(),
                size: format_size(file.size),
            };
            self.completed.push(summary.clone());
            finished = Some(summary);
            self.revision += 1;
        }

        self.refresh_totals();
        finished
    }

    fn refresh_totals(&mut self) {
        self.totals = aggregate::calculate(&self.entries);
    }
}
