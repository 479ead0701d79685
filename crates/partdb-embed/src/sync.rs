//! Embedding synchronization.
//!
//! Brings stored embeddings back in line with part descriptions. Parts whose
//! embedding is absent or stale are embedded in fixed-size batches, one
//! provider request per batch, sequentially. A failed batch is recorded and
//! skipped; the run continues with the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use partdb_core::model::{EmbeddingUpdate, PendingEmbedding};
use partdb_core::{Database, PartId};
use serde::Serialize;

use crate::error::SyncError;
use crate::provider::{validate_batch, EmbeddingProvider};

/// Default number of parts embedded per provider request.
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// A batch the provider could not embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Zero-based position of the batch within the run.
    pub index: usize,
    pub part_ids: Vec<PartId>,
    pub error: String,
}

/// Outcome of one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Parts found absent or stale at the start of the run.
    pub candidates: usize,
    /// Batches handed to the provider.
    pub batches: usize,
    /// Parts whose embedding is now fresh.
    pub synced: usize,
    /// Parts whose description changed (or that were deleted) while their
    /// batch was being embedded; they remain stale.
    pub superseded: usize,
    pub failures: Vec<BatchFailure>,
    /// The run stopped early because the cancel flag was raised.
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    /// True when every candidate ended up fresh.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.superseded == 0 && !self.cancelled
    }

    /// Number of parts in failed batches.
    pub fn failed_parts(&self) -> usize {
        self.failures.iter().map(|f| f.part_ids.len()).sum()
    }
}

/// Recomputes absent or stale embeddings.
#[derive(Debug)]
pub struct Synchronizer<'a> {
    db: &'a Database,
    provider: &'a dyn EmbeddingProvider,
    batch_size: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(db: &'a Database, provider: &'a dyn EmbeddingProvider) -> Self {
        Self {
            db,
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: None,
        }
    }

    /// Set the number of parts per provider request. Zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Stop before the next batch once `flag` becomes true.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Embed every part whose embedding is absent or stale.
    ///
    /// Provider failures are collected per batch in the report. Only store
    /// errors abort the run; batches written before such an error stay
    /// written.
    pub async fn sync_all(&self) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        let pending = self.db.list_unsynced_parts()?;
        let mut report = SyncReport {
            candidates: pending.len(),
            ..SyncReport::default()
        };

        if pending.is_empty() {
            log::info!("All embeddings are up to date");
            report.duration_ms = elapsed_ms(start);
            return Ok(report);
        }

        log::info!(
            "Embedding {} parts with {} in batches of {}",
            pending.len(),
            self.provider.name(),
            self.batch_size
        );

        for (index, batch) in pending.chunks(self.batch_size).enumerate() {
            if self.is_cancelled() {
                log::warn!("Embedding sync cancelled before batch {}", index);
                report.cancelled = true;
                break;
            }

            report.batches += 1;
            match self.embed_batch(batch).await {
                Ok(updates) => {
                    let written = self.db.store_embeddings(&updates)?;
                    let superseded = batch.len() - written;
                    if superseded > 0 {
                        log::info!(
                            "Batch {}: {} parts changed while embedding, left stale",
                            index,
                            superseded
                        );
                    }
                    log::debug!("Batch {}: stored {} embeddings", index, written);
                    report.synced += written;
                    report.superseded += superseded;
                }
                Err(e) => {
                    log::warn!("Batch {} failed ({} parts): {}", index, batch.len(), e);
                    report.failures.push(BatchFailure {
                        index,
                        part_ids: batch.iter().map(|p| p.id).collect(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.duration_ms = elapsed_ms(start);
        log::info!(
            "Embedding sync finished: {} synced, {} superseded, {} failed batches",
            report.synced,
            report.superseded,
            report.failures.len()
        );
        Ok(report)
    }

    async fn embed_batch(
        &self,
        batch: &[PendingEmbedding],
    ) -> crate::error::ProviderResult<Vec<EmbeddingUpdate>> {
        let texts: Vec<String> = batch.iter().map(|p| p.description.clone()).collect();
        let vectors = self.provider.embed_batch(&texts).await?;
        validate_batch(self.provider, batch.len(), &vectors)?;

        Ok(batch
            .iter()
            .zip(vectors)
            .map(|(pending, embedding)| EmbeddingUpdate {
                id: pending.id,
                source_description: pending.description.clone(),
                embedding,
            })
            .collect())
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
