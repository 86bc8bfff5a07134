//! Row-chunked data-parallel execution.
//!
//! Heavy passes (pairwise distances, batched queries, Boruvka rounds) split
//! their rows into contiguous chunks. Every chunk owns a disjoint `&mut`
//! slice of the pre-allocated output, so no locking is involved. Whether a
//! pass runs in parallel is decided by an explicit [`ExecutionContext`]
//! supplied by the caller; there is no process-wide switch.

use std::num::NonZeroUsize;
#[cfg(feature = "parallel")]
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use tracing::warn;

const DEFAULT_MIN_CHUNK_ROWS: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(rows) => rows,
    None => NonZeroUsize::MIN,
};

/// Controls how row-chunked passes are scheduled.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use bunrui_core::ExecutionContext;
///
/// let context = ExecutionContext::default()
///     .with_max_threads(NonZeroUsize::new(2).expect("non-zero"))
///     .with_min_chunk_rows(NonZeroUsize::new(16).expect("non-zero"));
/// assert_eq!(context.min_chunk_rows().get(), 16);
/// assert!(!ExecutionContext::sequential().should_parallelize(10_000));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    parallel: bool,
    max_threads: Option<NonZeroUsize>,
    min_chunk_rows: NonZeroUsize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            max_threads: None,
            min_chunk_rows: DEFAULT_MIN_CHUNK_ROWS,
        }
    }
}

impl ExecutionContext {
    /// A context that never parallelises.
    #[must_use]
    pub const fn sequential() -> Self {
        Self {
            parallel: false,
            max_threads: None,
            min_chunk_rows: DEFAULT_MIN_CHUNK_ROWS,
        }
    }

    /// A context that parallelises any pass with at least two rows.
    #[must_use]
    pub const fn force_parallel() -> Self {
        Self {
            parallel: true,
            max_threads: None,
            min_chunk_rows: NonZeroUsize::MIN,
        }
    }

    /// Enables or disables parallel execution.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Caps the worker count by running passes on a dedicated pool.
    #[must_use]
    pub const fn with_max_threads(mut self, threads: NonZeroUsize) -> Self {
        self.max_threads = Some(threads);
        self
    }

    /// Sets the smallest number of rows handed to a single worker.
    #[must_use]
    pub const fn with_min_chunk_rows(mut self, rows: NonZeroUsize) -> Self {
        self.min_chunk_rows = rows;
        self
    }

    /// Whether parallel execution is enabled.
    #[must_use]
    #[rustfmt::skip]
    pub const fn parallel(&self) -> bool { self.parallel }

    /// Configured worker cap.
    #[must_use]
    #[rustfmt::skip]
    pub const fn max_threads(&self) -> Option<NonZeroUsize> { self.max_threads }

    /// Smallest chunk size in rows.
    #[must_use]
    #[rustfmt::skip]
    pub const fn min_chunk_rows(&self) -> NonZeroUsize { self.min_chunk_rows }

    /// Whether a pass over `rows` rows is worth splitting.
    #[must_use]
    pub fn should_parallelize(&self, rows: usize) -> bool {
        cfg!(feature = "parallel")
            && self.parallel
            && rows >= self.min_chunk_rows.get().saturating_mul(2)
    }

    /// Rows per chunk for a pass over `rows` rows.
    #[must_use]
    pub fn chunk_rows(&self, rows: usize) -> usize {
        let workers = self.worker_hint();
        rows.div_ceil(workers.saturating_mul(4))
            .max(self.min_chunk_rows.get())
            .max(1)
    }

    fn worker_hint(&self) -> usize {
        match self.max_threads {
            Some(threads) => threads.get(),
            #[cfg(feature = "parallel")]
            None => rayon::current_num_threads().max(1),
            #[cfg(not(feature = "parallel"))]
            None => 1,
        }
    }

    /// Runs `f` over contiguous row chunks of `out`.
    ///
    /// `out` is interpreted as rows of `row_width` values. `f` receives the
    /// index of the first row in its chunk and the chunk's mutable slice.
    pub fn for_each_row_chunk<T, F>(&self, out: &mut [T], row_width: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        if row_width == 0 || out.is_empty() {
            return;
        }
        let rows = out.len() / row_width;
        let chunk_rows = self.chunk_rows(rows);
        let chunk_len = chunk_rows.saturating_mul(row_width);
        match self.plan(rows) {
            Plan::Sequential => {
                for (chunk_index, chunk) in out.chunks_mut(chunk_len).enumerate() {
                    f(chunk_index * chunk_rows, chunk);
                }
            }
            #[cfg(feature = "parallel")]
            plan => plan.install(|| {
                out.par_chunks_mut(chunk_len)
                    .enumerate()
                    .for_each(|(chunk_index, chunk)| f(chunk_index * chunk_rows, chunk));
            }),
        }
    }

    /// Runs `f` over matching row chunks of two buffers.
    ///
    /// Both buffers must hold the same number of rows, of widths `a_width`
    /// and `b_width` respectively.
    pub fn for_each_row_chunk_pair<A, B, F>(
        &self,
        a: &mut [A],
        a_width: usize,
        b: &mut [B],
        b_width: usize,
        f: F,
    ) where
        A: Send,
        B: Send,
        F: Fn(usize, &mut [A], &mut [B]) + Send + Sync,
    {
        if a_width == 0 || b_width == 0 || a.is_empty() {
            return;
        }
        let rows = a.len() / a_width;
        debug_assert_eq!(rows, b.len() / b_width, "buffers must hold the same rows");
        let chunk_rows = self.chunk_rows(rows);
        let a_len = chunk_rows.saturating_mul(a_width);
        let b_len = chunk_rows.saturating_mul(b_width);
        match self.plan(rows) {
            Plan::Sequential => {
                for (chunk_index, (a_chunk, b_chunk)) in
                    a.chunks_mut(a_len).zip(b.chunks_mut(b_len)).enumerate()
                {
                    f(chunk_index * chunk_rows, a_chunk, b_chunk);
                }
            }
            #[cfg(feature = "parallel")]
            plan => plan.install(|| {
                a.par_chunks_mut(a_len)
                    .zip(b.par_chunks_mut(b_len))
                    .enumerate()
                    .for_each(|(chunk_index, (a_chunk, b_chunk))| {
                        f(chunk_index * chunk_rows, a_chunk, b_chunk);
                    });
            }),
        }
    }

    /// Maps every row index in `0..rows` through `f`, preserving order.
    pub fn map_rows<R, F>(&self, rows: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        match self.plan(rows) {
            Plan::Sequential => (0..rows).map(f).collect(),
            #[cfg(feature = "parallel")]
            plan => {
                let min_len = self.chunk_rows(rows);
                plan.install(|| {
                    (0..rows)
                        .into_par_iter()
                        .with_min_len(min_len)
                        .map(&f)
                        .collect()
                })
            }
        }
    }

    fn plan(&self, rows: usize) -> Plan {
        if !self.should_parallelize(rows) {
            return Plan::Sequential;
        }
        #[cfg(feature = "parallel")]
        {
            let Some(threads) = self.max_threads else {
                return Plan::Global;
            };
            shared_pool(threads).map_or(Plan::Sequential, Plan::Pool)
        }
        #[cfg(not(feature = "parallel"))]
        Plan::Sequential
    }
}

enum Plan {
    Sequential,
    #[cfg(feature = "parallel")]
    Global,
    #[cfg(feature = "parallel")]
    Pool(Arc<rayon::ThreadPool>),
}

/// Returns the process-wide pool capped at `threads` workers.
///
/// Each size is built at most once. A size whose pool failed to build stays
/// sequential for the life of the process.
#[cfg(feature = "parallel")]
fn shared_pool(threads: NonZeroUsize) -> Option<Arc<rayon::ThreadPool>> {
    type Pools = HashMap<usize, Option<Arc<rayon::ThreadPool>>>;
    static POOLS: OnceLock<Mutex<Pools>> = OnceLock::new();

    let mut pools = POOLS
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    pools
        .entry(threads.get())
        .or_insert_with(|| {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads.get())
                .build()
            {
                Ok(pool) => Some(Arc::new(pool)),
                Err(error) => {
                    warn!(
                        threads = threads.get(),
                        error = %error,
                        "failed to build worker pool; running sequentially"
                    );
                    None
                }
            }
        })
        .clone()
}

#[cfg(feature = "parallel")]
impl Plan {
    fn install<R: Send>(self, op: impl FnOnce() -> R + Send) -> R {
        match self {
            Self::Pool(pool) => pool.install(op),
            Self::Global | Self::Sequential => op(),
        }
    }
}
