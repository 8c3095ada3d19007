//! Classify one cocoa bean photo with the bundled models.
//!
//! ```text
//! cargo run -p cocoa-core --example classify_bean -- <photo> [settings.json]
//! ```

use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use log::info;

use cocoa_core::RoastClassifier;
use cocoa_utils::{
    config::{AppSettings, default_settings_path},
    configure_from_settings, init_logging, normalize_path,
};

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;

    let mut args = env::args_os().skip(1);
    let photo = args
        .next()
        .map(PathBuf::from)
        .context("usage: classify_bean <photo> [settings.json]")?;
    let settings = load_settings(args.next().map(PathBuf::from))?;
    configure_from_settings(&settings.telemetry);

    let photo = normalize_path(&photo)?;
    let classifier = RoastClassifier::from_settings(&settings)?;
    let report = classifier.classify_path(&photo)?;
    info!("Classified {}", photo.display());

    println!("{}", report.presentation);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize report")?
    );

    classifier.release();
    Ok(())
}

fn load_settings(config_path: Option<PathBuf>) -> Result<AppSettings> {
    match config_path {
        Some(path) => AppSettings::load_from_path(normalize_path(&path)?),
        None => {
            let default_path = default_settings_path();
            if default_path.exists() {
                AppSettings::load_from_path(&default_path)
            } else {
                Ok(AppSettings::default())
            }
        }
    }
}
