//! Feature modules managed by the registry.

pub mod auto_downloader;
pub mod catalog;
pub mod library;
pub mod media_player;
pub mod torrent;
pub mod update_checker;

pub use auto_downloader::AutoDownloader;
pub use catalog::{ANILIST_ENDPOINT, AnilistCatalog, CollectionSummary, RemoteCatalog};
pub use library::WatcherModule;
pub use media_player::{MediaPlayer, MediaPlayers, Mpv, MpcHc, PlayerDescriptor, Vlc};
pub use torrent::{QbittorrentFactory, TorrentClientFactory, TorrentClientModule};
pub use update_checker::UpdateChecker;
