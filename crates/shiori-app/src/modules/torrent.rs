//! Torrent client module and the factory that builds it from settings.

use std::sync::Arc;

use async_trait::async_trait;
use shiori_config::TorrentSettings;
use shiori_events::ModuleKind;
use shiori_torrent::{QbittorrentClient, QbittorrentOptions, TorrentClient, TorrentResult};

use crate::error::ModuleResult;
use crate::registry::Module;

/// Builds a torrent client from the torrent settings section.
pub trait TorrentClientFactory: Send + Sync {
    /// Construct a client. Must not perform network I/O.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot describe a client.
    fn build(&self, settings: &TorrentSettings) -> TorrentResult<Arc<dyn TorrentClient>>;
}

/// Factory producing qBittorrent Web API clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct QbittorrentFactory;

impl TorrentClientFactory for QbittorrentFactory {
    fn build(&self, settings: &TorrentSettings) -> TorrentResult<Arc<dyn TorrentClient>> {
        let client = QbittorrentClient::new(QbittorrentOptions {
            host: settings.qbittorrent_host.clone(),
            port: settings.qbittorrent_port,
            username: settings.qbittorrent_username.clone(),
            password: settings.qbittorrent_password.clone(),
            executable_path: settings.qbittorrent_path.clone(),
        })?;
        Ok(Arc::new(client))
    }
}

/// Registry slot wrapper around the current torrent client.
pub struct TorrentClientModule {
    client: Arc<dyn TorrentClient>,
}

impl TorrentClientModule {
    /// Wrap `client`.
    #[must_use]
    pub fn new(client: Arc<dyn TorrentClient>) -> Self {
        Self { client }
    }

    /// Shared client reference.
    #[must_use]
    pub fn client(&self) -> Arc<dyn TorrentClient> {
        Arc::clone(&self.client)
    }
}

impl std::fmt::Debug for TorrentClientModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorrentClientModule")
            .field("client", &self.client.descriptor())
            .finish()
    }
}

#[async_trait]
impl Module for TorrentClientModule {
    const KIND: ModuleKind = ModuleKind::TorrentClient;

    async fn start(&self) -> ModuleResult<()> {
        Ok(())
    }

    async fn stop(&self) -> ModuleResult<()> {
        Ok(())
    }

    fn detail(&self) -> Option<String> {
        let descriptor = self.client.descriptor();
        Some(format!("{}@{}:{}", descriptor.kind, descriptor.host, descriptor.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qbittorrent_factory_builds_without_network() -> anyhow::Result<()> {
        let client = QbittorrentFactory.build(&TorrentSettings {
            qbittorrent_host: "10.0.0.2".into(),
            qbittorrent_port: 8090,
            qbittorrent_username: "admin".into(),
            qbittorrent_password: "secret".into(),
            qbittorrent_path: String::new(),
        })?;
        let module = TorrentClientModule::new(client);
        assert_eq!(module.detail().as_deref(), Some("qbittorrent@10.0.0.2:8090"));
        assert!(!format!("{module:?}").contains("secret"));
        Ok(())
    }
}
