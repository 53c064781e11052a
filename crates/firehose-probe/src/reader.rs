//! Streaming readers and their byte counters.

use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use futures_util::StreamExt;
use tracing::{info, warn};

/// Bytes received by one simulated client.
pub struct Reader {
    pub name: String,
    url: String,
    bytes: AtomicU64,
}

impl Reader {
    pub fn new(name: String, url: String) -> Self {
        Self {
            name,
            url,
            bytes: AtomicU64::new(0),
        }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Open one streaming request and count bytes until the server hangs
    /// up or the request fails. Failures are logged, not retried.
    pub async fn run(&self, client: reqwest::Client) {
        if let Err(e) = self.read_stream(client).await {
            warn!(reader = %self.name, url = %self.url, "reader stopped: {e}");
        }
    }

    async fn read_stream(&self, client: reqwest::Client) -> Result<(), reqwest::Error> {
        let response = client.post(&self.url).send().await?.error_for_status()?;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if self.bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed) == 0 {
                info!(reader = %self.name, "Started reading from: {}", self.url);
            }
        }
        info!(reader = %self.name, bytes = self.bytes(), "stream closed by server");
        Ok(())
    }
}

/// All readers of one probe run, addressable as `reader.<i>`.
#[derive(Clone)]
pub struct ReaderList {
    readers: Arc<Vec<Arc<Reader>>>,
}

impl ReaderList {
    pub fn new(url: &str, count: usize) -> Self {
        let readers = (0..count)
            .map(|i| Arc::new(Reader::new(format!("reader.{i}"), url.to_string())))
            .collect();
        Self {
            readers: Arc::new(readers),
        }
    }

    pub fn readers(&self) -> &[Arc<Reader>] {
        &self.readers
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.readers
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.bytes())
    }

    /// Byte count per reader, keyed by name.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.readers
            .iter()
            .map(|r| (r.name.clone(), r.bytes()))
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.readers.iter().map(|r| r.bytes()).sum()
    }
}
