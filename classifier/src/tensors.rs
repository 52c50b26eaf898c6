use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tract_core::internal::*;

/// Accounting for the tensors an inference run allocates.
///
/// Every value handed over with [`TensorPool::adopt`] counts as live until
/// its [`PooledTensor`] guard is dropped, so the count returns to its
/// previous value once a run is over, whichever way it ended.
#[derive(Clone, Debug, Default)]
pub struct TensorPool {
    live: Arc<AtomicUsize>,
}

impl TensorPool {
    pub fn new() -> TensorPool {
        TensorPool::default()
    }

    pub fn adopt(&self, value: TValue) -> PooledTensor {
        self.live.fetch_add(1, Ordering::Relaxed);
        PooledTensor { value, live: self.live.clone() }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct PooledTensor {
    value: TValue,
    live: Arc<AtomicUsize>,
}

impl PooledTensor {
    /// A shared handle on the same data, for feeding a plan without a copy.
    pub fn value(&self) -> TValue {
        self.value.clone()
    }
}

impl Deref for PooledTensor {
    type Target = Tensor;
    fn deref(&self) -> &Tensor {
        &self.value
    }
}

impl Drop for PooledTensor {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}
