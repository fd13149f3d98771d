use super::types::{SelectedFile, UploadEvent};
use crate::config::AppConfig;
use crate::progress::BatchId;
use anyhow::{anyhow, Context as _, Result};
use bytes::Bytes;
use futures::stream::{self, Stream};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Url};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

const CHUNK_SIZE: usize = 64 * 1024;

/// Posts one batch of CSV files as a single multipart request.
#[derive(Clone)]
pub struct BatchUploader {
    client: reqwest::Client,
    endpoint: Url,
}

impl BatchUploader {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint("upload")?,
        })
    }

    /// Runs the upload on a worker thread. Exactly one `Finished` or `Failed`
    /// event is sent for the batch, preceded by any number of `Progress` ticks.
    pub fn spawn(&self, batch: BatchId, files: Vec<SelectedFile>, sender: Sender<UploadEvent>) {
        let uploader = self.clone();

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Could not start upload runtime: {}", e);
                    let _ = sender.send(UploadEvent::Failed {
                        batch,
                        error: e.to_string(),
                    });
                    return;
                }
            };

            rt.block_on(async {
                let event = match uploader.upload(batch, &files, &sender).await {
                    Ok(()) => {
                        log::info!("Batch {:?} uploaded ({} files)", batch, files.len());
                        UploadEvent::Finished { batch }
                    }
                    Err(e) => {
                        log::error!("Error uploading batch {:?}: {:#}", batch, e);
                        UploadEvent::Failed {
                            batch,
                            error: format!("{:#}", e),
                        }
                    }
                };
                let _ = sender.send(event);
            });
        });
    }

    pub async fn upload(
        &self,
        batch: BatchId,
        files: &[SelectedFile],
        sender: &Sender<UploadEvent>,
    ) -> Result<()> {
        let mut contents = Vec::with_capacity(files.len());
        for file in files {
            let data = tokio::fs::read(&file.path)
                .await
                .with_context(|| format!("Failed to read {}", file.name))?;
            contents.push((file.name.clone(), Bytes::from(data)));
        }

        let total: u64 = contents.iter().map(|(_, data)| data.len() as u64).sum();
        let counter = Arc::new(ByteCounter::new(batch, total, sender.clone()));

        let mut form = Form::new();
        for (name, data) in contents {
            let length = data.len() as u64;
            let body = Body::wrap_stream(CountingStream::new(chunked(data), counter.clone()));
            let part = Part::stream_with_length(body, length)
                .file_name(name)
                .mime_str("text/csv")?;
            form = form.part("files", part);
        }

        log::info!(
            "Uploading batch {:?} ({} files, {} bytes) to {}",
            batch,
            files.len(),
            total,
            self.endpoint
        );

        let res = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .context("Failed to send upload request")?;

        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = res.text().await.unwrap_or_default();
            Err(anyhow!("Upload failed with status {}: {}", status, text.trim()))
        }
    }
}

fn chunked(mut data: Bytes) -> impl Stream<Item = io::Result<Bytes>> + Send + Sync + Unpin {
    let mut chunks = Vec::new();
    while data.len() > CHUNK_SIZE {
        chunks.push(Ok(data.split_to(CHUNK_SIZE)));
    }
    if !data.is_empty() {
        chunks.push(Ok(data));
    }
    stream::iter(chunks)
}

pub(crate) fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (sent as f64 * 100.0 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Bytes handed to the transport for the whole request, shared by every part.
struct ByteCounter {
    batch: BatchId,
    total: u64,
    sent: AtomicU64,
    last_percent: AtomicU8,
    sender: Mutex<Sender<UploadEvent>>,
}

impl ByteCounter {
    fn new(batch: BatchId, total: u64, sender: Sender<UploadEvent>) -> Self {
        Self {
            batch,
            total,
            sent: AtomicU64::new(0),
            last_percent: AtomicU8::new(0),
            sender: Mutex::new(sender),
        }
    }

    fn record(&self, bytes: u64) {
        let sent = self.sent.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let percent = percent_of(sent, self.total);

        if self.last_percent.swap(percent, Ordering::Relaxed) != percent {
            log::debug!("Batch {:?}: {}% sent", self.batch, percent);
            if let Ok(sender) = self.sender.lock() {
                let _ = sender.send(UploadEvent::Progress {
                    batch: self.batch,
                    percent,
                });
            }
        }
    }
}

struct CountingStream<S> {
    stream: S,
    counter: Arc<ByteCounter>,
}

impl<S> CountingStream<S> {
    fn new(stream: S, counter: Arc<ByteCounter>) -> Self {
        Self { stream, counter }
    }
}

impl<S: Stream<Item = io::Result<Bytes>> + Unpin> Stream for CountingStream<S> {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.stream).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.counter.record(chunk.len() as u64);
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::mpsc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config_for(addr: std::net::SocketAddr) -> AppConfig {
        AppConfig {
            server_url: Url::parse(&format!("http://{}/", addr)).unwrap(),
            ..AppConfig::default()
        }
    }

    fn csv_file(dir: &std::path::Path, name: &str, body: &str) -> SelectedFile {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        SelectedFile::from_path(&path).unwrap()
    }

    /// Accepts one request, reads it to the closing multipart boundary and
    /// answers with `status_line`. Returns the raw request text.
    async fn serve_once(listener: TcpListener, status_line: &'static str) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.ends_with(b"--\r\n") || request.ends_with(b"\r\n0\r\n\r\n") {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            status_line
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&request).to_string()
    }

    #[test]
    fn percent_rounds_and_handles_empty_requests() {
        assert_eq!(percent_of(0, 200), 0);
        assert_eq!(percent_of(1, 200), 1);
        assert_eq!(percent_of(100, 200), 50);
        assert_eq!(percent_of(200, 200), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[tokio::test]
    async fn counting_stream_reports_only_changes() {
        let (tx, rx) = mpsc::channel();
        let counter = Arc::new(ByteCounter::new(BatchId(7), 4, tx));
        let chunks = stream::iter(vec![
            Ok::<Bytes, io::Error>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"")),
            Ok(Bytes::from_static(b"cd")),
        ]);

        let collected: Vec<_> = CountingStream::new(chunks, counter).collect().await;

        assert_eq!(collected.len(), 3);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                UploadEvent::Progress { batch: BatchId(7), percent: 50 },
                UploadEvent::Progress { batch: BatchId(7), percent: 100 },
            ]
        );
    }

    #[test]
    fn chunking_splits_large_payloads() {
        let data = Bytes::from(vec![0u8; CHUNK_SIZE * 2 + 10]);
        let sizes: Vec<usize> = futures::executor::block_on_stream(chunked(data))
            .map(|c| c.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![CHUNK_SIZE, CHUNK_SIZE, 10]);
    }

    #[tokio::test]
    async fn posts_every_file_under_the_files_field() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener, "200 OK"));

        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            csv_file(dir.path(), "a.csv", "id,name\n1,Ann\n"),
            csv_file(dir.path(), "b.csv", "id,name\n2,Bob\n"),
        ];
        let (tx, rx) = mpsc::channel();
        let uploader = BatchUploader::new(&config_for(addr)).unwrap();

        uploader.upload(BatchId(1), &files, &tx).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /upload "));
        assert!(request.to_lowercase().contains("multipart/form-data"));
        assert_eq!(request.matches("name=\"files\"").count(), 2);
        assert!(request.contains("filename=\"a.csv\""));
        assert!(request.contains("2,Bob"));
        let last = rx.try_iter().last();
        assert_eq!(
            last,
            Some(UploadEvent::Progress { batch: BatchId(1), percent: 100 })
        );
    }

    #[tokio::test]
    async fn server_error_fails_the_batch() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener, "500 Internal Server Error"));

        let dir = tempfile::tempdir().unwrap();
        let files = vec![csv_file(dir.path(), "c.csv", "id\n3\n")];
        let (tx, _rx) = mpsc::channel();
        let uploader = BatchUploader::new(&config_for(addr)).unwrap();

        let result = uploader.upload(BatchId(2), &files, &tx).await;
        server.await.unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn spawned_upload_reports_failure_when_server_is_gone() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let files = vec![csv_file(dir.path(), "c.csv", "id\n3\n")];
        let (tx, rx) = mpsc::channel();

        BatchUploader::new(&config_for(addr))
            .unwrap()
            .spawn(BatchId(3), files, tx);

        let outcome = rx
            .iter()
            .find(|e| !matches!(e, UploadEvent::Progress { .. }))
            .unwrap();
        assert!(matches!(outcome, UploadEvent::Failed { batch: BatchId(3), .. }));
    }
}
