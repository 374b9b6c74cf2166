//! Flat device-resident arrays.

/// A flat array living in device memory.
///
/// Only a [`Device`](super::Device) can create one or move data across the
/// host boundary; jobs running on the device borrow it through
/// [`as_slice`](Self::as_slice) / [`as_mut_slice`](Self::as_mut_slice).
#[derive(Debug)]
pub struct DeviceArray<T> {
    data: Vec<T>,
}

impl<T: Copy + Send + Sync> DeviceArray<T> {
    pub(crate) fn from_host(host: &[T]) -> Self {
        Self {
            data: host.to_vec(),
        }
    }

    pub(crate) fn filled(len: usize, value: T) -> Self {
        Self {
            data: vec![value; len],
        }
    }

    pub(crate) fn to_host(&self) -> Vec<T> {
        self.data.clone()
    }

    pub(crate) fn overwrite(&mut self, host: &[T]) {
        self.data.copy_from_slice(host);
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the allocation in bytes.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
