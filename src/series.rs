//! Append-only time series of acceleration samples
//!
//! [`TimeSeries`] is the plain storage; [`SharedTimeSeries`] is the handle the
//! acquisition worker appends through while the UI takes snapshots. Every
//! append happens under the write lock, so a snapshot sees each sample either
//! completely or not at all.
//!
//! Indices are dense: the first sample is 0 and each append must carry the
//! next index. Samples are never removed or rewritten.

use crate::error::{FreefallError, Result};
use crate::types::Sample;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Ordered, gap-free sequence of samples
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty series with room for `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Index the next appended sample must carry
    pub fn next_index(&self) -> u64 {
        self.samples.len() as u64
    }

    /// Append a sample.
    ///
    /// Fails with [`FreefallError::OutOfOrder`] unless `sample.index` equals
    /// [`next_index`](Self::next_index).
    pub fn append(&mut self, sample: Sample) -> Result<()> {
        let expected = self.next_index();
        if sample.index != expected {
            return Err(FreefallError::OutOfOrder {
                expected,
                got: sample.index,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Copy of all samples in index order
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.clone()
    }

    /// Samples with `index >= from`
    pub fn since(&self, from: u64) -> &[Sample] {
        let start = (from as usize).min(self.samples.len());
        &self.samples[start..]
    }

}

/// Thread-safe handle to a [`TimeSeries`].
///
/// Cloning the handle shares the same series. Only the acquisition worker
/// appends; any number of readers may snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedTimeSeries {
    inner: Arc<RwLock<TimeSeries>>,
}

impl SharedTimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TimeSeries::with_capacity(capacity))),
        }
    }

    // A panic while holding the lock cannot leave a half-written sample
    // (append is a single push), so poisoned locks are recovered.
    fn read(&self) -> RwLockReadGuard<'_, TimeSeries> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TimeSeries> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, sample: Sample) -> Result<()> {
        self.write().append(sample)
    }

    /// Consistent copy of every sample appended so far
    pub fn snapshot(&self) -> Vec<Sample> {
        self.read().snapshot()
    }

    /// Copy of the samples with `index >= from`
    pub fn since(&self, from: u64) -> Vec<Sample> {
        self.read().since(from).to_vec()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn next_index(&self) -> u64 {
        self.read().next_index()
    }

    pub fn last(&self) -> Option<Sample> {
        self.read().last().copied()
    }
}
