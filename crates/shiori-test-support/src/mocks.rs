//! Recording fakes for the torrent client and scan job seams.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use shiori_library::{LibraryResult, ScanJob};
use shiori_torrent::{
    AddTorrent, TorrentClient, TorrentClientDescriptor, TorrentResult, TorrentSummary,
};
use tokio::sync::Notify;

/// Torrent client that records submissions and answers queries from memory.
#[derive(Debug, Default)]
pub struct RecordingTorrentClient {
    label: String,
    submitted: Mutex<Vec<AddTorrent>>,
    torrents: Mutex<Vec<TorrentSummary>>,
}

impl RecordingTorrentClient {
    /// Create a client identified by `label` in its descriptor.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Requests received through [`TorrentClient::submit`].
    #[must_use]
    pub fn submitted(&self) -> Vec<AddTorrent> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace what [`TorrentClient::query`] returns.
    pub fn set_torrents(&self, torrents: Vec<TorrentSummary>) {
        *self.torrents.lock().unwrap_or_else(PoisonError::into_inner) = torrents;
    }
}

#[async_trait]
impl TorrentClient for RecordingTorrentClient {
    async fn submit(&self, request: AddTorrent) -> TorrentResult<()> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        Ok(())
    }

    async fn query(&self) -> TorrentResult<Vec<TorrentSummary>> {
        Ok(self
            .torrents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn descriptor(&self) -> TorrentClientDescriptor {
        TorrentClientDescriptor {
            kind: "recording".to_string(),
            host: self.label.clone(),
            port: 0,
            username: None,
        }
    }
}

/// Scan job that records every requested path and wakes waiters.
#[derive(Debug, Default)]
pub struct RecordingScanJob {
    scans: Mutex<Vec<PathBuf>>,
    scanned: Notify,
}

impl RecordingScanJob {
    /// Shared handle suitable for `AutoScanner::new`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Paths scanned so far.
    #[must_use]
    pub fn scans(&self) -> Vec<PathBuf> {
        self.scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait until the next scan completes.
    pub async fn wait_for_scan(&self) {
        self.scanned.notified().await;
    }
}

#[async_trait]
impl ScanJob for RecordingScanJob {
    async fn scan(&self, path: &Path) -> LibraryResult<()> {
        self.scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
        self.scanned.notify_one();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiori_torrent::TorrentSource;

    #[tokio::test]
    async fn recording_client_keeps_submissions() -> anyhow::Result<()> {
        let client = RecordingTorrentClient::new("fake");
        client
            .submit(AddTorrent {
                source: TorrentSource::magnet("magnet:?xt=urn:btih:abc"),
                save_path: None,
                paused: false,
            })
            .await?;
        assert_eq!(client.submitted().len(), 1);
        assert!(client.query().await?.is_empty());
        assert_eq!(client.descriptor().host, "fake");
        Ok(())
    }

    #[tokio::test]
    async fn recording_scan_job_wakes_waiters() -> anyhow::Result<()> {
        let job = RecordingScanJob::shared();
        job.scan(Path::new("/media/anime")).await?;
        job.wait_for_scan().await;
        assert_eq!(job.scans(), vec![PathBuf::from("/media/anime")]);
        Ok(())
    }
}
