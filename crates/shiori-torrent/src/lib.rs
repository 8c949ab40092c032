#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Torrent client contract and the qBittorrent Web API adapter.

pub mod client;
pub mod error;
pub mod model;
pub mod qbittorrent;

pub use client::TorrentClient;
pub use error::{TorrentError, TorrentResult};
pub use model::{AddTorrent, TorrentClientDescriptor, TorrentSource, TorrentState, TorrentSummary};
pub use qbittorrent::{QbittorrentClient, QbittorrentOptions};
