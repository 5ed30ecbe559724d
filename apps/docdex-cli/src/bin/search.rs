use std::env;
use std::sync::Arc;

use docdex_core::config::DocdexConfig;
use docdex_engine::TantivyEngine;
use docdex_pipeline::DocdexService;
use docdex_query::QueryOptions;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [--tags a,b] [--size N] [--answer]", args[0]);
        eprintln!("Example: {} 'vacation policy' --tags HR --answer", args[0]);
        std::process::exit(1);
    }
    let query = args[1].clone();
    let mut options = QueryOptions::default();
    let mut with_answer = false;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--answer" | "-a" => with_answer = true,
            "--tags" | "-t" => {
                if i + 1 < args.len() {
                    options.tags = args[i + 1]
                        .split(',')
                        .map(|t| t.trim().to_string())
                        .collect();
                    i += 1;
                }
            }
            "--size" | "-n" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<usize>() {
                        Ok(n) => options.size = Some(n),
                        Err(_) => {
                            eprintln!("Error: --size requires a number");
                            std::process::exit(1);
                        }
                    }
                    i += 1;
                }
            }
            "--fuzzy" => options.fuzzy = Some(true),
            _ => {}
        }
        i += 1;
    }

    let config = DocdexConfig::load()?;
    let engine = TantivyEngine::new(&config.engine)?;
    let service = DocdexService::new(Arc::new(engine), &config)?;

    println!("🔍 docdex-search\n================");
    println!("Query: {}", query);

    let response = service.search(&query, &options, with_answer)?;
    println!("\n🔍 Found {} results for: \"{}\"", response.hits.len(), response.query);
    if response.degraded {
        println!("⚠️  Highlighting degraded: some documents were too large to analyze");
    }
    for (i, hit) in response.hits.iter().enumerate() {
        println!(
            "\n  {}. score={:.4}  id={}  type={}  file={}",
            i + 1,
            hit.score,
            hit.id,
            hit.doc_type,
            hit.filename
        );
        if let Some(fragment) = hit.highlights.values().flatten().next() {
            println!("     📝 Context: {}", fragment);
        }
    }

    if let Some(answer) = response.answer {
        println!("\n💬 Answer (confidence {:.0}%):", answer.confidence * 100.0);
        println!("{}", answer.answer);
        if !answer.sources.is_empty() {
            println!("\n📄 Sources: {}", answer.sources.join(", "));
        }
        if !answer.suggestions.is_empty() {
            println!("💡 Related: {}", answer.suggestions.join(", "));
        }
    }

    println!("\n📊 Tag counts:");
    for (tag, count) in service.tag_aggregation()? {
        println!("  {}: {} documents", tag, count);
    }
    Ok(())
}
