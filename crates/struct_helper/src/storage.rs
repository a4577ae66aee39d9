//! Owned storage for one described instance.

use std::fmt;

use crate::archive::{Archive, ArchiveError};
use crate::descriptor::{CompareFlags, DescriptorRef};

/// A heap buffer holding exactly one constructed instance of `descriptor`.
///
/// Construction zero-fills and constructs; dropping destroys and frees. The
/// buffer therefore never exposes uninitialised bytes, and every exit path
/// releases what the instance owns.
pub struct OwnedStorage {
    descriptor: DescriptorRef,
    bytes: Box<[u8]>,
}

impl OwnedStorage {
    /// Allocate and construct a default instance
    pub fn new(descriptor: DescriptorRef) -> Self {
        let mut bytes = vec![0u8; descriptor.size()].into_boxed_slice();
        descriptor.construct(&mut bytes);
        tracing::trace!(type_id = descriptor.type_id(), size = bytes.len(), "constructed storage");
        Self { descriptor, bytes }
    }

    /// Allocate, construct, then semantically copy `src` in
    pub fn copy_of(descriptor: DescriptorRef, src: &[u8]) -> Self {
        let mut storage = Self::new(descriptor);
        storage.copy_from(src);
        storage
    }

    pub fn descriptor(&self) -> &DescriptorRef {
        &self.descriptor
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Semantic copy from an instance of the same type
    pub fn copy_from(&mut self, src: &[u8]) {
        self.descriptor.copy(&mut self.bytes, src);
    }

    /// Semantic copy into caller-owned, constructed storage of the same type
    pub fn copy_to(&self, dst: &mut [u8]) {
        self.descriptor.copy(dst, &self.bytes);
    }

    pub fn compare(&self, other: &[u8], flags: CompareFlags) -> bool {
        self.descriptor.compare_equal(&self.bytes, other, flags)
    }

    pub fn serialize(&mut self, ar: &mut dyn Archive) -> Result<(), ArchiveError> {
        self.descriptor.serialize(ar, &mut self.bytes)
    }
}

impl Drop for OwnedStorage {
    fn drop(&mut self) {
        self.descriptor.destroy(&mut self.bytes);
        tracing::trace!(type_id = self.descriptor.type_id(), "destroyed storage");
    }
}

impl fmt::Debug for OwnedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedStorage")
            .field("type_id", &self.descriptor.type_id())
            .field("value", &self.descriptor.to_value(&self.bytes))
            .finish()
    }
}
