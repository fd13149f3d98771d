mod state;
mod ui;

use crate::config::AppConfig;
use crate::progress::ProgressStore;
use crate::stream::{ProgressListener, StreamEvent};
use crate::students::{StudentsClient, StudentsFetcher};
use crate::upload::{validate_selection, BatchUploader, SelectionError, UploadEvent};
use anyhow::Result;
use derivative::Derivative;
use eframe::App;
use reqwest::Url;
use state::{AppState, FETCH_ERROR, UPLOAD_ERROR};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Derivative)]
#[derivative(Debug)]
pub struct CsvUploaderApp {
    config: AppConfig,
    progress_endpoint: Url,
    store: ProgressStore,
    listener: ProgressListener,
    #[derivative(Debug = "ignore")]
    uploader: BatchUploader,
    #[derivative(Debug = "ignore")]
    fetcher: StudentsFetcher,
    upload_sender: Sender<UploadEvent>,
    upload_receiver: Receiver<UploadEvent>,
    uploads_in_flight: usize,
    state: AppState,
}

impl CsvUploaderApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        log::info!("Initializing CSV uploader against {}", config.server_url);
        let (upload_sender, upload_receiver) = mpsc::channel();

        Ok(Self {
            progress_endpoint: config.endpoint("progress/sse")?,
            uploader: BatchUploader::new(&config)?,
            fetcher: StudentsFetcher::new(StudentsClient::new(&config)?),
            store: ProgressStore::new(),
            listener: ProgressListener::new(),
            upload_sender,
            upload_receiver,
            uploads_in_flight: 0,
            state: AppState::new(config.page_size),
            config,
        })
    }

    /// Validates a selection and, if accepted, starts uploading it as one batch.
    pub fn select_files(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }

        let files = match validate_selection(&paths) {
            Ok(files) => files,
            Err(e) => {
                if let SelectionError::NotCsv(names) = &e {
                    log::warn!("Rejected selection with non-CSV files: {:?}", names);
                } else {
                    log::warn!("Rejected selection: {}", e);
                }
                self.state.alert = Some(e.to_string());
                return;
            }
        };

        self.state.show_progress = true;
        let batch = self
            .store
            .track_batch(files.iter().map(|f| (f.name.clone(), f.size)));

        log::info!("Starting upload of batch {:?} ({} files)", batch, files.len());
        self.uploader.spawn(batch, files, self.upload_sender.clone());
        self.uploads_in_flight += 1;
        self.sync_listener();
    }

    fn apply_upload_event(&mut self, event: UploadEvent) {
        match event {
            UploadEvent::Progress { batch, percent } => {
                self.store.set_batch_upload_progress(batch, percent);
            }
            UploadEvent::Finished { batch } => {
                self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
                self.store.finish_batch_upload(batch);
            }
            UploadEvent::Failed { batch, error } => {
                self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
                let removed = self.store.rollback_batch(batch);
                log::error!("Upload of {:?} failed: {}", removed, error);
                self.state.error_message = Some(UPLOAD_ERROR.to_string());
            }
        }
    }

    fn apply_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Message(progress) => {
                if let Some(done) = self.store.apply_processing(&progress) {
                    log::info!("Finished processing {} ({})", done.name, done.size);
                }
            }
            StreamEvent::Malformed(payload) => {
                log::warn!("Error processing progress message: {}", payload);
            }
            StreamEvent::Disconnected { connection, reason } => {
                log::debug!("Progress stream {} closed: {}", connection, reason);
            }
        }
    }

    /// Keeps the push connection alive exactly while files are tracked.
    fn sync_listener(&mut self) {
        if self.store.is_empty() {
            if self.listener.is_live() {
                self.listener.close();
            }
        } else {
            self.listener
                .ensure_open(&self.progress_endpoint, self.store.revision());
        }
    }

    fn refresh_students(&mut self) {
        if self.state.needs_fetch() {
            let query = self.state.query.clone();
            self.fetcher.request(query.clone());
            self.state.last_requested = Some(query);
        }

        match self.fetcher.poll() {
            Some(Ok(page)) => self.state.apply_page(page),
            Some(Err(e)) => {
                log::error!("Error fetching students: {}", e);
                self.state.error_message = Some(FETCH_ERROR.to_string());
            }
            None => {}
        }
    }

    /// Applies every pending worker event. Returns whether anything is still
    /// running in the background.
    fn process_events(&mut self) -> bool {
        let uploads: Vec<UploadEvent> = self.upload_receiver.try_iter().collect();
        for event in uploads {
            self.apply_upload_event(event);
        }

        for event in self.listener.poll_events() {
            self.apply_stream_event(event);
        }

        self.sync_listener();
        self.refresh_students();

        self.uploads_in_flight > 0 || self.listener.is_live() || self.fetcher.is_pending()
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        if self.process_events() {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
    }
}

impl App for CsvUploaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
