//! Hash container: a hash table engine plus the build-side row storage.
//!
//! The table maps key hashes to `RowPtr`s into the container's `ChunkList`.
//! Distinct keys can share a hash, so every candidate is re-checked with a
//! full key comparison before it is returned as a match.

use joinadapt_core::{hash_row_keys, keys_equal, ChunkList, HashContext, Row, RowBatch, RowPtr};

use crate::error::{Error, Result};
use crate::HashTable;

pub struct HashContainer {
    records: ChunkList,
    table: Box<dyn HashTable>,
    build_ctx: HashContext,
    skipped_null_rows: usize,
}

/// Hash every row of one chunk and hand non-null keys to `insert`.
/// Returns the number of rows skipped for null keys.
fn insert_chunk_rows<F>(
    chunk: &RowBatch,
    chunk_idx: u32,
    ctx: &HashContext,
    mut insert: F,
) -> Result<usize>
where
    F: FnMut(u64, RowPtr) -> Result<()>,
{
    let mut skipped = 0;
    for row_idx in 0..chunk.num_rows() {
        let row = chunk
            .row(row_idx)
            .ok_or_else(|| Error::Invariant(format!("row {} vanished from chunk", row_idx)))?;
        let key = hash_row_keys(row, ctx)?;
        if key.has_null {
            skipped += 1;
            continue;
        }
        insert(key.hash, RowPtr::new(chunk_idx, row_idx as u32))?;
    }
    Ok(skipped)
}

impl HashContainer {
    pub fn new(table: Box<dyn HashTable>, build_ctx: HashContext) -> Self {
        Self {
            records: ChunkList::new(),
            table,
            build_ctx,
            skipped_null_rows: 0,
        }
    }

    /// Store `chunk` and insert each of its rows with a non-null key.
    pub fn put_chunk(&mut self, chunk: RowBatch) -> Result<()> {
        let Self {
            records,
            table,
            build_ctx,
            skipped_null_rows,
        } = self;
        let chunk_idx = records.add(chunk)?;
        let chunk = records
            .chunk(chunk_idx)
            .ok_or_else(|| Error::Invariant(format!("chunk {} missing after add", chunk_idx)))?;
        *skipped_null_rows +=
            insert_chunk_rows(chunk, chunk_idx, build_ctx, |k, p| table.put(k, p))?;
        Ok(())
    }

    /// Store all `chunks`, then insert their rows using up to `workers`
    /// threads. Returns once every worker has finished, so the table is
    /// complete and safe to probe.
    ///
    /// More than one worker requires an engine that supports shared inserts.
    pub fn build_parallel(&mut self, chunks: Vec<RowBatch>, workers: usize) -> Result<()> {
        let mut indices = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            indices.push(self.records.add(chunk)?);
        }

        let workers = workers.min(indices.len()).max(1);
        if workers == 1 {
            let Self {
                records,
                table,
                build_ctx,
                skipped_null_rows,
            } = self;
            for idx in indices {
                let chunk = records
                    .chunk(idx)
                    .ok_or_else(|| Error::Invariant(format!("chunk {} missing", idx)))?;
                *skipped_null_rows +=
                    insert_chunk_rows(chunk, idx, build_ctx, |k, p| table.put(k, p))?;
            }
            return Ok(());
        }

        let shared = self.table.concurrent().ok_or_else(|| {
            Error::Unsupported(format!(
                "{} is single-writer; cannot build with {} workers",
                self.table.name(),
                workers
            ))
        })?;
        let records = &self.records;
        let ctx = &self.build_ctx;

        let skipped = std::thread::scope(|s| -> Result<usize> {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    let mine: Vec<u32> = indices.iter().copied().skip(w).step_by(workers).collect();
                    s.spawn(move || -> Result<usize> {
                        let mut skipped = 0;
                        for idx in mine {
                            let chunk = records.chunk(idx).ok_or_else(|| {
                                Error::Invariant(format!("chunk {} missing", idx))
                            })?;
                            skipped +=
                                insert_chunk_rows(chunk, idx, ctx, |k, p| shared.put_shared(k, p))?;
                        }
                        Ok(skipped)
                    })
                })
                .collect();

            let mut total = 0;
            for handle in handles {
                total += handle
                    .join()
                    .map_err(|_| Error::Invariant("build worker panicked".into()))??;
            }
            Ok(total)
        })?;
        self.skipped_null_rows += skipped;
        Ok(())
    }

    /// Build rows whose join key equals the key of `probe`.
    ///
    /// A probe row with a null key matches nothing.
    pub fn get_matched_rows<'a>(
        &'a self,
        probe: Row<'_>,
        probe_ctx: &HashContext,
    ) -> Result<Vec<Row<'a>>> {
        let key = hash_row_keys(probe, probe_ctx)?;
        if key.has_null {
            return Ok(Vec::new());
        }
        let candidates = self.table.get(key.hash)?;
        let mut matched = Vec::with_capacity(candidates.len());
        for ptr in candidates {
            let row = self.records.get_row(ptr).ok_or_else(|| {
                Error::Invariant(format!("row pointer {:?} outside row storage", ptr))
            })?;
            if keys_equal(row, &self.build_ctx, probe, probe_ctx)? {
                matched.push(row);
            }
        }
        Ok(matched)
    }

    /// Entries in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rows held in storage, including those skipped for null keys.
    pub fn num_rows(&self) -> usize {
        self.records.num_rows()
    }

    pub fn skipped_null_rows(&self) -> usize {
        self.skipped_null_rows
    }

    pub fn table_name(&self) -> &'static str {
        self.table.name()
    }
}
