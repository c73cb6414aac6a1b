//! Work partitioning across independent worker processes.
//!
//! Each worker receives `(worker_count, worker_id)` and selects its shard of
//! the patch-index space. Every worker owns `total / worker_count` indices;
//! the `total % worker_count` leftovers go one each to the lowest worker ids.
//! By default those leftovers are the tail of the index space, matching the
//! task split the historical datasets were produced with.

use crate::patch_pipeline::common::error::{PatchError, Result};

/// Where the leftover indices of an uneven split end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShardLayout {
    /// Worker `k` owns `[k * base, (k + 1) * base)`; leftovers are taken from
    /// the tail, index `worker_count * base + k` going to worker `k`.
    #[default]
    TrailingRemainder,
    /// Shards are consecutive ranges; worker `k < remainder` is one longer.
    Contiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerAssignment {
    worker_count: usize,
    worker_id: usize,
    layout: ShardLayout,
}

impl WorkerAssignment {
    pub fn new(worker_count: usize, worker_id: usize) -> Result<Self> {
        if worker_count == 0 || worker_id >= worker_count {
            return Err(PatchError::InvalidWorker {
                worker_count,
                worker_id,
            });
        }
        Ok(Self {
            worker_count,
            worker_id,
            layout: ShardLayout::default(),
        })
    }

    /// The whole index space handled by a single process.
    pub fn single() -> Self {
        Self {
            worker_count: 1,
            worker_id: 0,
            layout: ShardLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: ShardLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn layout(&self) -> ShardLayout {
        self.layout
    }

    /// Indices of `0..total_items` owned by this worker, ascending.
    pub fn shard(&self, total_items: usize) -> Vec<usize> {
        let base = total_items / self.worker_count;
        let remainder = total_items % self.worker_count;
        let has_extra = self.worker_id < remainder;

        match self.layout {
            ShardLayout::Contiguous => {
                let start = self.worker_id * base + self.worker_id.min(remainder);
                let len = base + usize::from(has_extra);
                (start..start + len).collect()
            }
            ShardLayout::TrailingRemainder => {
                let start = self.worker_id * base;
                let mut indices: Vec<usize> = (start..start + base).collect();
                if has_extra {
                    indices.push(self.worker_count * base + self.worker_id);
                }
                indices
            }
        }
    }
}

pub fn partition(total_items: usize, worker_count: usize, worker_id: usize) -> Result<Vec<usize>> {
    Ok(WorkerAssignment::new(worker_count, worker_id)?.shard(total_items))
}
