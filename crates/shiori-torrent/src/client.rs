//! Client trait implemented by torrent client adapters.

use async_trait::async_trait;

use crate::error::TorrentResult;
use crate::model::{AddTorrent, TorrentClientDescriptor, TorrentSummary};

/// Outbound contract of a torrent client: submit and query.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Hand a torrent to the client.
    async fn submit(&self, request: AddTorrent) -> TorrentResult<()>;

    /// List the torrents the client currently tracks.
    async fn query(&self) -> TorrentResult<Vec<TorrentSummary>>;

    /// Describe where the client lives, without secrets.
    fn descriptor(&self) -> TorrentClientDescriptor;
}
