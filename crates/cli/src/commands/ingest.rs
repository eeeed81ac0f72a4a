//! `ragline ingest`: Segment and index a directory, then print the report.

use std::path::PathBuf;

use ragline_config::AppConfig;

use crate::runtime::Runtime;

pub async fn run(dir: PathBuf, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let runtime = Runtime::build(&config)?;

    let report = runtime.ingestor.ingest_dir(&dir).await?;
    let modes = runtime.orchestrator.index().mode_counts().await;

    if json {
        let out = serde_json::json!({ "report": report, "embedding_modes": modes });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Ingested {}", dir.display());
    println!("   Documents:  {}", report.documents);
    println!("   Chunks:     {}", report.chunks);
    println!("   Skipped:    {} (shorter than {} chars)", report.skipped, config.corpus.min_chunk_chars);
    println!("   Embeddings: {} semantic, {} fallback", modes.semantic, modes.fallback);
    for failure in &report.failures {
        println!("   Failed:     {} ({})", failure.path.display(), failure.reason);
    }

    Ok(())
}
