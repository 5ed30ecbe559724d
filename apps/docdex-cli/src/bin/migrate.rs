use std::env;
use std::sync::Arc;

use docdex_core::config::DocdexConfig;
use docdex_core::traits::SearchEngine;
use docdex_core::types::Mapping;
use docdex_engine::TantivyEngine;
use docdex_index::SchemaMigrator;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");

    let config = DocdexConfig::load()?;
    let engine = Arc::new(TantivyEngine::new(&config.engine)?);

    println!("🔁 docdex-migrate\n=================");
    println!("Alias: {}", config.engine.alias);

    let current = engine.get_schema(&config.engine.alias)?;
    let target = Mapping::current();
    println!("Current generation: {}", current.generation);
    if current.mapping == target {
        println!("✅ Schema already up to date, nothing to do");
        return Ok(());
    }
    for (name, kind) in &target.fields {
        match current.mapping.kind_of(name) {
            Some(have) if have != *kind => {
                println!("  ~ {}: {} -> {}", name, have, kind);
            }
            None => println!("  + {}: {}", name, kind),
            _ => {}
        }
    }
    if dry_run {
        println!("\n⏭️  Dry run, no changes made");
        return Ok(());
    }

    let migrator = SchemaMigrator::new(engine, &config.index);
    let report = migrator.migrate(&config.engine.alias, target)?;
    println!("\n✅ Migration completed");
    println!("📊 {} -> {}", report.from, report.to);
    println!("📊 {} documents copied in {:.1}s", report.documents, report.elapsed.as_secs_f64());
    Ok(())
}
