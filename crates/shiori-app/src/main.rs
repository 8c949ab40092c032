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

//! Binary entrypoint: parse the process options and run the lifecycle.

use std::process::ExitCode;

use clap::Parser;
use shiori_app::run;
use shiori_config::ConfigOptions;

/// Boots Shiori and blocks until the lifecycle terminates.
#[tokio::main]
async fn main() -> ExitCode {
    let options = ConfigOptions::parse();
    run(options).await.into()
}
