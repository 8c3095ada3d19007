//! Common helpers shared across the cocoa roast scanner crates.

/// Application configuration and settings management.
pub mod config;
/// Sparse pixel statistics for spotting blank or overexposed captures.
pub mod diagnostics;
/// Test fixture loading and path resolution.
pub mod fixtures;
/// Image decoding and resizing.
pub mod image_utils;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{AppSettings, InputDimensions, ModelSettings, ResizeFilter, TensorEncoding};
pub use diagnostics::{ChannelStats, ImageStats};
pub use fixtures::{
    fixture_path, fixtures_dir, load_fixture_bytes, load_fixture_image, load_fixture_json,
};
pub use image_utils::{decode_image, resize_image};
pub use telemetry::{
    TELEMETRY_TARGET, TimingGuard, configure as configure_telemetry, configure_from_settings,
    telemetry_allows, telemetry_enabled, telemetry_level, timing_guard,
};

/// Initialize logging once.
///
/// `RUST_LOG` takes precedence when set; otherwise `default_filter` applies. Telemetry records
/// are always let through so [`telemetry::configure`] alone decides whether they are emitted.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(TELEMETRY_TARGET, LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
