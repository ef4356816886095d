//! Sizing of the rayon pool used for per-time-step reductions
//!
//! Files are always loaded one after another; only the arithmetic of
//! [`statistics::parallel`](crate::statistics::parallel) runs on these threads.

use crate::errors::{BgcError, Result};
use log::{debug, warn};
use rayon::ThreadPoolBuilder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Worker threads; `None` keeps rayon's default of one per core
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Size the global pool once, before any reduction runs.
    ///
    /// Returns the number of worker threads reductions will use.
    pub fn setup_global_pool(&self) -> Result<usize> {
        let cores = num_cpus::get();
        let Some(threads) = self.num_threads else {
            debug!(
                "Reducing on the default pool ({} threads, {} cores)",
                rayon::current_num_threads(),
                cores
            );
            return Ok(rayon::current_num_threads());
        };

        if threads == 0 {
            return Err(BgcError::ThreadPoolError(
                "thread count must be at least 1".to_string(),
            ));
        }
        if threads > cores {
            warn!("{threads} threads requested on {cores} cores, reductions will oversubscribe");
        }

        ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("bgc-reduce-{i}"))
            .build_global()
            .map_err(|e| {
                BgcError::ThreadPoolError(format!("cannot size the pool to {threads}: {e}"))
            })?;
        debug!("Reducing on {threads} threads");
        Ok(threads)
    }

    /// Threads a reduction started now would run on.
    #[must_use]
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}
