//! Device buffer abstraction.
//!
//! Stages treat their working arrays as living on an accelerator: data is
//! uploaded once, jobs run against device-resident arrays, and results are
//! downloaded explicitly. The CPU backends keep the arrays in host memory,
//! but every crossing still goes through [`Device`] so transfers stay
//! explicit and measurable, and a GPU backend can slot in behind the same
//! calls.
//!
//! ## Transfers
//!
//! | Call | Direction |
//! |------|-----------|
//! | [`Device::upload`] / [`Device::upload_ragged`] | host → device |
//! | [`Device::alloc_zeroed`] / [`Device::alloc_ragged`] | none (device allocation) |
//! | [`Device::download`] / [`Device::download_ragged`] | device → host |
//! | [`Device::update`] / [`Device::update_ragged`] | host → device, same size |
//!
//! Arrays free themselves on drop.

mod array;
mod executor;
mod ragged;

pub use array::DeviceArray;
pub use executor::{Backend, Executor, RayonPool, Sequential};
pub use ragged::{flatten, spans_for, unflatten, RaggedArray, Span};

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Error, RenderConfig, Result};

/// Bytes moved across the host boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub uploaded_bytes: usize,
    pub downloaded_bytes: usize,
}

/// Owns the execution backend and mediates every host/device transfer.
#[derive(Debug)]
pub struct Device {
    backend: Backend,
    uploaded: AtomicUsize,
    downloaded: AtomicUsize,
}

impl Device {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            uploaded: AtomicUsize::new(0),
            downloaded: AtomicUsize::new(0),
        }
    }

    /// Device running every job on the calling thread.
    pub fn sequential() -> Self {
        Self::new(Backend::Sequential(Sequential))
    }

    /// Pick a backend from the run configuration.
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        let backend = match (config.parallel, config.num_threads) {
            (false, _) => Backend::Sequential(Sequential),
            (true, None) => Backend::Rayon(RayonPool::global()),
            (true, Some(n)) => Backend::Rayon(RayonPool::with_threads(n)?),
        };
        tracing::debug!("Device backend: {}", backend.name());
        Ok(Self::new(backend))
    }

    #[inline]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn transfer_stats(&self) -> TransferStats {
        TransferStats {
            uploaded_bytes: self.uploaded.load(Ordering::Relaxed),
            downloaded_bytes: self.downloaded.load(Ordering::Relaxed),
        }
    }

    fn count_upload<T>(&self, len: usize) {
        self.uploaded
            .fetch_add(len * std::mem::size_of::<T>(), Ordering::Relaxed);
    }

    fn count_download<T>(&self, len: usize) {
        self.downloaded
            .fetch_add(len * std::mem::size_of::<T>(), Ordering::Relaxed);
    }

    pub fn upload<T: Copy + Send + Sync>(&self, host: &[T]) -> DeviceArray<T> {
        self.count_upload::<T>(host.len());
        DeviceArray::from_host(host)
    }

    pub fn alloc_zeroed<T: Copy + Send + Sync + Default>(&self, len: usize) -> DeviceArray<T> {
        DeviceArray::filled(len, T::default())
    }

    pub fn download<T: Copy + Send + Sync>(&self, array: &DeviceArray<T>) -> Vec<T> {
        self.count_download::<T>(array.len());
        array.to_host()
    }

    /// Overwrite a device array with host data of the same length.
    pub fn update<T: Copy + Send + Sync>(&self, array: &mut DeviceArray<T>, host: &[T]) -> Result<()> {
        if array.len() != host.len() {
            return Err(Error::TransferSizeMismatch {
                expected: array.len(),
                actual: host.len(),
            });
        }
        self.count_upload::<T>(host.len());
        array.overwrite(host);
        Ok(())
    }

    /// Upload nested items as one flat transfer.
    pub fn upload_ragged<T: Copy + Send + Sync>(&self, items: &[Vec<T>]) -> RaggedArray<T> {
        let (flat, spans) = flatten(items);
        RaggedArray {
            data: self.upload(&flat),
            spans,
        }
    }

    /// Allocate zeroed items of the given lengths in one allocation.
    pub fn alloc_ragged<T: Copy + Send + Sync + Default>(&self, lens: &[usize]) -> RaggedArray<T> {
        let spans = spans_for(lens);
        let total = spans.last().map_or(0, Span::end);
        RaggedArray {
            data: self.alloc_zeroed(total),
            spans,
        }
    }

    pub fn download_ragged<T: Copy + Send + Sync>(&self, array: &RaggedArray<T>) -> Vec<Vec<T>> {
        let flat = self.download(&array.data);
        unflatten(&flat, &array.spans)
    }

    /// Overwrite every item of a ragged array. Item count and every item
    /// length must match.
    pub fn update_ragged<T: Copy + Send + Sync>(
        &self,
        array: &mut RaggedArray<T>,
        items: &[Vec<T>],
    ) -> Result<()> {
        if items.len() != array.spans.len() {
            return Err(Error::TransferSizeMismatch {
                expected: array.spans.len(),
                actual: items.len(),
            });
        }
        for (span, item) in array.spans.iter().zip(items) {
            if span.len != item.len() {
                return Err(Error::TransferSizeMismatch {
                    expected: span.len,
                    actual: item.len(),
                });
            }
        }
        let (flat, _) = flatten(items);
        self.update(&mut array.data, &flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_download_counts_bytes() {
        let device = Device::sequential();
        let array = device.upload(&[1.0f32, 2.0, 3.0]);
        assert_eq!(device.download(&array), vec![1.0, 2.0, 3.0]);

        let stats = device.transfer_stats();
        assert_eq!(stats.uploaded_bytes, 12);
        assert_eq!(stats.downloaded_bytes, 12);
    }

    #[test]
    fn test_alloc_is_not_a_transfer() {
        let device = Device::sequential();
        let array: DeviceArray<u32> = device.alloc_zeroed(16);
        assert_eq!(array.len(), 16);
        assert!(array.as_slice().iter().all(|&v| v == 0));
        assert_eq!(device.transfer_stats(), TransferStats::default());
    }

    #[test]
    fn test_update_size_mismatch() {
        let device = Device::sequential();
        let mut array = device.upload(&[0u32; 4]);
        let err = device.update(&mut array, &[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::TransferSizeMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_ragged_round_trip_single_transfer() {
        let device = Device::sequential();
        let items = vec![vec![1u32, 2], vec![3, 4, 5], vec![]];
        let array = device.upload_ragged(&items);

        assert_eq!(array.len(), 3);
        assert_eq!(array.item(1), &[3, 4, 5]);
        assert_eq!(array.flat(), &[1, 2, 3, 4, 5]);
        assert_eq!(device.download_ragged(&array), items);
        assert_eq!(device.transfer_stats().uploaded_bytes, 20);
    }

    #[test]
    fn test_update_ragged() {
        let device = Device::sequential();
        let mut array: RaggedArray<u32> = device.alloc_ragged(&[2, 1]);
        device
            .update_ragged(&mut array, &[vec![7, 8], vec![9]])
            .unwrap();
        assert_eq!(array.item(0), &[7, 8]);
        assert_eq!(array.item(1), &[9]);

        assert!(device
            .update_ragged(&mut array, &[vec![1], vec![2, 3]])
            .is_err());
    }

    #[test]
    fn test_item_mut_writes_through() {
        let device = Device::sequential();
        let mut array: RaggedArray<f32> = device.alloc_ragged(&[3, 3]);
        array.item_mut(1)[2] = 5.0;
        assert_eq!(array.flat()[5], 5.0);
    }

    #[test]
    fn test_from_config_selects_backend() {
        let config = RenderConfig {
            parallel: false,
            ..Default::default()
        };
        let device = Device::from_config(&config).unwrap();
        assert_eq!(device.backend().name(), "sequential");

        let config = RenderConfig {
            num_threads: Some(2),
            ..Default::default()
        };
        let device = Device::from_config(&config).unwrap();
        assert_eq!(device.backend().name(), "rayon");
    }
}
