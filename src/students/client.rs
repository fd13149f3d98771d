use super::query::QueryState;
use super::types::StudentPage;
use crate::config::AppConfig;
use anyhow::{anyhow, Context as _, Result};
use reqwest::Url;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Clone)]
pub struct StudentsClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl StudentsClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint("students")?,
        })
    }

    pub async fn fetch(&self, query: &QueryState) -> Result<StudentPage> {
        let res = self
            .client
            .get(self.endpoint.clone())
            .query(&query.to_params())
            .send()
            .await
            .context("Failed to send students request")?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("Students request failed with status {}: {}", status, text.trim()));
        }

        res.json::<StudentPage>()
            .await
            .context("Failed to parse students response")
    }
}

#[derive(Debug)]
struct FetchOutcome {
    request: u64,
    result: Result<StudentPage, String>,
}

/// Runs listing requests off the UI thread. Only the newest request's
/// outcome is handed back; older responses are dropped on arrival.
pub struct StudentsFetcher {
    client: StudentsClient,
    next_request: u64,
    latest: Option<u64>,
    sender: Sender<FetchOutcome>,
    receiver: Receiver<FetchOutcome>,
}

impl StudentsFetcher {
    pub fn new(client: StudentsClient) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            client,
            next_request: 0,
            latest: None,
            sender,
            receiver,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.latest.is_some()
    }

    pub fn request(&mut self, query: QueryState) -> u64 {
        let request = self.next_request;
        self.next_request += 1;
        self.latest = Some(request);

        let client = self.client.clone();
        let sender = self.sender.clone();

        log::debug!("Fetching students (request {}): {:?}", request, query);
        std::thread::spawn(move || {
            let result = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt
                    .block_on(client.fetch(&query))
                    .map_err(|e| format!("{:#}", e)),
                Err(e) => Err(e.to_string()),
            };
            let _ = sender.send(FetchOutcome { request, result });
        });

        request
    }

    /// Returns the outcome of the newest request once it has arrived.
    pub fn poll(&mut self) -> Option<Result<StudentPage, String>> {
        let mut fresh = None;
        for outcome in self.receiver.try_iter() {
            if Some(outcome.request) == self.latest {
                self.latest = None;
                fresh = Some(outcome.result);
            } else {
                log::debug!("Discarding stale students response {}", outcome.request);
            }
        }
        fresh
    }
}
