//! lessonloader - load lessons and modules from a content directory or a
//! remote content service, with caching, retries and progress reporting.

mod cli;
mod config;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lessonloader_core::registry::RegistryBuilder;
use lessonloader_core::{
    ContentLoader, ContentSource, DirectorySource, HttpContentSource, LoadPhase, LoadProgress,
    ProgressCallback,
};
use serde_json::json;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Command, USAGE};
use config::Config;

/// Timeout for a single HTTP request to the content service
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. `RUST_LOG=lessonloader_core=debug`).
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = cli::parse_args(&args)?;
    if invocation.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load()?;
    if let Some(dir) = invocation.content_dir {
        config.content_dir = Some(dir);
    }

    let loader = build_loader(&config)?;
    info!(known_ids = loader.registry().len(), "lessonloader ready");

    match invocation.command {
        Command::List => list(&loader),
        Command::Lesson(id) => lesson(&loader, &id).await,
        Command::Collection(id) => collection(&loader, &id).await,
        Command::Stats => stats(&loader),
        Command::Help => Ok(()),
    }
}

fn build_loader(config: &Config) -> Result<ContentLoader> {
    let content_dir = config.content_dir();
    let registry = RegistryBuilder::new()
        .scan_directory(&content_dir)
        .with_context(|| format!("Failed to build registry from {}", content_dir.display()))?
        .build();

    let source: Arc<dyn ContentSource> = match &config.base_url {
        Some(base_url) => {
            let client = reqwest::Client::builder()
                .user_agent(concat!("lessonloader/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .context("Failed to create HTTP client")?;
            let mut source = HttpContentSource::with_client(client, base_url.clone());
            if let Some(token) = &config.token {
                source = source.with_token(token.as_str());
            }
            debug!(base_url = %base_url, "Using remote content source");
            Arc::new(source)
        }
        None => {
            debug!(dir = %content_dir.display(), "Using directory content source");
            Arc::new(DirectorySource::new(content_dir))
        }
    };

    Ok(ContentLoader::builder_with_source(registry, source)
        .config(config.loader.clone())
        .build())
}

fn list(loader: &ContentLoader) -> Result<()> {
    for id in loader.registry().list_known_ids() {
        println!("{}", id);
    }
    Ok(())
}

async fn lesson(loader: &ContentLoader, id: &str) -> Result<()> {
    let unit = loader.load_one(id).await;
    if unit.is_fallback {
        eprintln!("Lesson {} is not available, showing placeholder", id);
    }
    println!("{}", serde_json::to_string_pretty(&unit)?);

    if let Some(next) = next_lesson_hint(loader, id) {
        eprintln!("{}", next);
    }
    Ok(())
}

fn next_lesson_hint(loader: &ContentLoader, id: &str) -> Option<String> {
    loader
        .next_candidate(id)
        .map(|next| format!("Next lesson: {} (run `lessonloader lesson {}`)", next, next))
}

async fn collection(loader: &ContentLoader, collection_id: &str) -> Result<()> {
    let on_progress: ProgressCallback =
        Arc::new(|progress: &LoadProgress| eprintln!("{}", progress_line(progress)));

    let units = loader
        .load_collection(collection_id, Some(on_progress))
        .await
        .with_context(|| format!("Failed to load collection {}", collection_id))?;

    let summary = json!({
        "collection": collection_id,
        "count": units.len(),
        "fallbacks": units.iter().filter(|unit| unit.is_fallback).count(),
        "units": units
            .iter()
            .map(|unit| json!({
                "id": unit.id,
                "order": unit.order,
                "title": unit.title(),
                "isFallback": unit.is_fallback,
            }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn stats(loader: &ContentLoader) -> Result<()> {
    loader.purge_expired();
    println!("{}", serde_json::to_string_pretty(&loader.stats())?);
    Ok(())
}

fn progress_line(progress: &LoadProgress) -> String {
    let phase = match progress.phase {
        LoadPhase::Preparing => "preparing",
        LoadPhase::Loading => "loading",
        LoadPhase::Complete => "complete",
        LoadPhase::Error => "error",
    };
    let mut line = format!(
        "[{:>3}%] {:<9} {}/{}",
        progress.percent(),
        phase,
        progress.loaded,
        progress.total
    );
    if let Some(label) = &progress.current_item_label {
        line.push_str(&format!("  {}", label));
    }
    if let Some(error) = &progress.error {
        line.push_str(&format!("  {}", error));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line() {
        let line = progress_line(&LoadProgress::loading(4, 2, Some("Saving".to_string())));
        assert_eq!(line, "[ 50%] loading   2/4  Saving");

        let line = progress_line(&LoadProgress::failed("no units"));
        assert!(line.contains("error"));
        assert!(line.ends_with("no units"));
    }

    #[test]
    fn test_build_loader_scans_content_dir() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("module-1");
        std::fs::create_dir(&module).unwrap();
        std::fs::write(module.join("module-1-lesson-1.json"), r#"{"title": "Intro"}"#).unwrap();

        let config = Config {
            content_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let loader = build_loader(&config).unwrap();
        assert_eq!(loader.registry().list_known_ids(), vec!["module-1-lesson-1"]);
    }

    #[test]
    fn test_next_lesson_hint_only_for_known_ids() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("module-1");
        std::fs::create_dir(&module).unwrap();
        std::fs::write(module.join("module-1-lesson-1.json"), "{}").unwrap();
        std::fs::write(module.join("module-1-lesson-2.json"), "{}").unwrap();

        let config = Config {
            content_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let loader = build_loader(&config).unwrap();

        let hint = next_lesson_hint(&loader, "module-1-lesson-1").unwrap();
        assert!(hint.starts_with("Next lesson: module-1-lesson-2"));
        assert_eq!(next_lesson_hint(&loader, "module-1-lesson-2"), None);
        assert_eq!(loader.stats().units_in_flight, 0);
    }

    #[test]
    fn test_build_loader_missing_dir_fails() {
        let config = Config {
            content_dir: Some("/nonexistent/lessonloader".into()),
            ..Config::default()
        };
        assert!(build_loader(&config).is_err());
    }
}
