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

//! Shared data access layer for Shiori: migrations and the singleton
//! settings/account repositories backed by `SQLite`.

pub mod account;
pub mod error;
pub mod settings;
pub mod store;

pub use account::{ACCOUNT_ROW_ID, AccountRow};
pub use error::{DataError, Result as DataResult};
pub use settings::{SETTINGS_ROW_ID, SettingsRow};
pub use store::{DATABASE_FILE, Database, database_path};
