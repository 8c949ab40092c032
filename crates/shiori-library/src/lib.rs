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

//! Library watcher and auto-scanner.
//!
//! The watcher observes the library root and forwards bare change notifications
//! through a bounded [`ScanNotifier`] channel; the auto-scanner debounces them
//! and runs a [`ScanJob`] when enabled.

pub mod error;
pub mod notifier;
pub mod scanner;
pub mod watcher;

pub use error::{LibraryError, LibraryResult};
pub use notifier::{ScanNotifier, ScanRequests, scan_channel};
pub use scanner::{AutoScanner, DEFAULT_SCAN_DEBOUNCE, EventScanJob, ScanJob};
pub use watcher::LibraryWatcher;
