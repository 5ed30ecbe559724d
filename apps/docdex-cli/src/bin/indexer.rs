use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use docdex_core::config::DocdexConfig;
use docdex_engine::TantivyEngine;
use docdex_pipeline::DocdexService;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = DocdexConfig::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = None;
    let mut tags: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--tags" | "-t" => {
                if i + 1 < args.len() {
                    tags = args[i + 1].split(',').map(|t| t.trim().to_string()).collect();
                    i += 1;
                } else {
                    eprintln!("Error: --tags requires a comma-separated list");
                    std::process::exit(1);
                }
            }
            _ if !args[i].starts_with('-') => data_dir = Some(PathBuf::from(&args[i])),
            other => {
                eprintln!("Unknown flag: {}", other);
                std::process::exit(1);
            }
        }
        i += 1;
    }
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => {
            eprintln!("Usage: docdex-indexer <data_dir> [--tags a,b,c]");
            std::process::exit(1);
        }
    };

    println!("📚 docdex-indexer\n=================");
    println!("Data directory: {}", data_dir.display());
    println!("Index alias: {}", config.engine.alias);
    if !tags.is_empty() {
        println!("Tags: {}", tags.join(", "));
    }

    let engine = TantivyEngine::new(&config.engine)?;
    let service = DocdexService::new(Arc::new(engine), &config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("indexing...");
    let report = service.index_directory(&data_dir, &tags)?;
    spinner.finish_and_clear();

    println!("\n✅ Indexing completed");
    println!("📊 Indexed {} documents", report.indexed);
    if report.skipped > 0 {
        println!("⏭️  Skipped {} unsupported files", report.skipped);
    }
    for (path, reason) in &report.failed {
        println!("⚠️  {}: {}", path, reason);
    }

    let stats = service.stats()?;
    println!("\n📊 Index now holds {} documents", stats.documents);
    println!("\n💡 To search, use: cargo run --bin docdex-search '<query>'");
    Ok(())
}
