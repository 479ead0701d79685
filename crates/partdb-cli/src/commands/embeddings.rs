use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use partdb_embed::{provider, Config, SyncReport, Synchronizer};

use super::open_database;

/// Embed every part whose embedding is absent or stale.
///
/// Fails (non-zero exit) when any batch failed or the run was interrupted.
pub async fn run_update_embeddings(config: &Config, batch_size: Option<usize>) -> Result<()> {
    log::info!("Starting embedding update");

    let db = open_database(config)?;
    let provider = provider::from_config(config).context("Failed to set up embedding provider")?;

    let cancel = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted; stopping after the current batch...");
            signal_flag.store(true, Ordering::SeqCst);
        }
    });

    let batch_size = batch_size.unwrap_or(config.batch_size);
    println!(
        "Embedding with {} ({} dimensions), batches of {}",
        provider.name(),
        provider.dimensions(),
        batch_size
    );

    let report = Synchronizer::new(&db, provider.as_ref())
        .with_batch_size(batch_size)
        .with_cancel_flag(cancel)
        .sync_all()
        .await
        .context("Embedding update aborted")?;

    print_report(&report);

    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} of {} batches failed; run 'partdb update-embeddings' again to retry them",
            report.failures.len(),
            report.batches
        );
    }
    if report.cancelled {
        anyhow::bail!("Embedding update interrupted; finished batches were kept");
    }

    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.candidates == 0 {
        println!("✓ All embeddings are up to date");
        return;
    }

    println!("\nEmbedding update summary:");
    println!("  Parts needing embeddings: {}", report.candidates);
    println!("  Batches sent: {}", report.batches);
    println!("  Embedded: {}", report.synced);
    if report.superseded > 0 {
        println!(
            "  Changed during the run (still stale): {}",
            report.superseded
        );
    }
    for failure in &report.failures {
        let ids: Vec<String> = failure.part_ids.iter().map(ToString::to_string).collect();
        println!(
            "  ✗ Batch {} (parts {}): {}",
            failure.index,
            ids.join(", "),
            failure.error
        );
    }
    println!("  Time: {} ms", report.duration_ms);

    if report.is_complete() {
        println!("\n✓ Embeddings up to date");
    }
}
