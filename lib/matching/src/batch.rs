//! Batch scoring on a worker pool
//!
//! Large batches are split into fixed-size chunks of relations and scored on
//! a dedicated rayon pool sized to the available cores. The normalized lookup
//! table is built once and shared by reference with every worker. Chunk
//! results come back in chunk order, each chunk in input order, and the
//! first failing chunk aborts the batch.

use crate::normalize::normalize;
use crate::score::score;
use ahash::AHashMap;
use ebiodiv_core::{
    Error, FieldScores, NormalizedOccurrence, OccurrenceBatch, OccurrenceKey, Result,
};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

/// Normalized occurrences by key, read-only once built
pub type NormalizedTable = AHashMap<OccurrenceKey, NormalizedOccurrence>;

pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Configuration for a [`BatchScorer`]
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Relations per chunk
    pub chunk_size: usize,
    /// Worker threads; `None` means one per available core
    pub workers: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
        }
    }
}

/// Normalize every occurrence of a batch, failing on the first malformed one
pub fn normalize_batch(batch: &OccurrenceBatch) -> Result<NormalizedTable> {
    batch
        .keyed_occurrences()?
        .into_iter()
        .map(|(key, occurrence)| Ok((key, normalize(occurrence)?)))
        .collect()
}

/// Scores relations of a batch in parallel
pub struct BatchScorer {
    pool: ThreadPool,
    chunk_size: usize,
}

impl BatchScorer {
    pub fn new(options: BatchOptions) -> Result<Self> {
        let workers = options.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("scoring-worker-{}", i))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        Ok(Self {
            pool,
            chunk_size: options.chunk_size.max(1),
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Score `(subject, related)` key pairs against a normalized table
    ///
    /// The output has one entry per input pair, in input order.
    pub fn score_relations(
        &self,
        table: &NormalizedTable,
        relations: &[(OccurrenceKey, OccurrenceKey)],
    ) -> Result<Vec<FieldScores>> {
        debug!(
            relations = relations.len(),
            chunk_size = self.chunk_size,
            workers = self.workers(),
            "Scoring relations"
        );

        let chunks: Vec<Vec<FieldScores>> = self.pool.install(|| {
            relations
                .par_chunks(self.chunk_size)
                .map(|chunk| score_chunk(table, chunk))
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(chunks.into_iter().flatten().collect())
    }

    /// Attach scores to every relation of a batch, leaving occurrences untouched
    pub fn add_scores(&self, batch: &mut OccurrenceBatch) -> Result<()> {
        let table = normalize_batch(batch)?;
        let pairs: Vec<_> = batch
            .occurrence_relations
            .iter()
            .map(|r| (r.occurrence_key1, r.occurrence_key2))
            .collect();

        let scores = self.score_relations(&table, &pairs)?;
        for (relation, scores) in batch.occurrence_relations.iter_mut().zip(scores) {
            relation.scores = Some(scores);
        }
        Ok(())
    }
}

fn score_chunk(
    table: &NormalizedTable,
    chunk: &[(OccurrenceKey, OccurrenceKey)],
) -> Result<Vec<FieldScores>> {
    chunk
        .iter()
        .map(|&(subject, related)| {
            let a = table.get(&subject).ok_or(Error::OccurrenceNotFound(subject))?;
            let b = table.get(&related).ok_or(Error::OccurrenceNotFound(related))?;
            Ok(score(a, b))
        })
        .collect()
}
