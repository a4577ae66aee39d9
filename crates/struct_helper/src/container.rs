//! Struct container: a box holding at most one instance of a runtime-typed struct.
//!
//! The container either is empty or holds storage constructed for exactly
//! one descriptor. The two never drift apart because the descriptor lives
//! inside the storage: there is no way to observe a type without a payload
//! or a payload without a type.
//!
//! Scripts use it to carry a struct whose type is only known at runtime
//! through pins that are typed as "any struct", and to get it back out once
//! they know (and check) what it is.

use std::fmt;

use blueprint_types::Value;

use crate::archive::{Archive, ArchiveError};
use crate::descriptor::{CompareFlags, DescriptorRef, FieldError, same_descriptor, same_descriptor_opt};
use crate::storage::OwnedStorage;

/// Type-erased box over a described struct
#[derive(Default)]
pub struct StructContainer {
    storage: Option<OwnedStorage>,
}

impl StructContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self { storage: None }
    }

    /// Create a container holding a default-constructed instance
    pub fn with_descriptor(descriptor: DescriptorRef) -> Self {
        let mut container = Self::new();
        container.bind(descriptor);
        container
    }

    /// Whether a type is bound (and therefore a payload is present)
    pub fn is_populated(&self) -> bool {
        self.storage.is_some()
    }

    /// The bound descriptor
    pub fn descriptor(&self) -> Option<&DescriptorRef> {
        self.storage.as_ref().map(OwnedStorage::descriptor)
    }

    /// Raw payload bytes. Only meaningful together with [`descriptor`](Self::descriptor).
    pub fn payload(&self) -> Option<&[u8]> {
        self.storage.as_ref().map(OwnedStorage::bytes)
    }

    /// Drop any current content and hold a freshly constructed instance of `descriptor`
    pub fn bind(&mut self, descriptor: DescriptorRef) {
        self.unbind();
        tracing::trace!(type_id = descriptor.type_id(), "binding struct container");
        self.storage = Some(OwnedStorage::new(descriptor));
    }

    /// Destroy and free the content, if any
    pub fn unbind(&mut self) {
        if let Some(storage) = self.storage.take() {
            tracing::trace!(type_id = storage.descriptor().type_id(), "unbinding struct container");
        }
    }

    /// Replace the content with a semantic copy of `other`'s
    pub fn assign(&mut self, other: &StructContainer) {
        self.unbind();
        if let Some(source) = &other.storage {
            self.storage = Some(OwnedStorage::copy_of(source.descriptor().clone(), source.bytes()));
        }
    }

    /// Copy the payload into caller-owned storage of the same type.
    ///
    /// `target` must hold a constructed instance of `target_descriptor`.
    /// Fails, leaving `target` untouched, when the container is empty, the
    /// descriptors are not the same type, or the buffer has the wrong size.
    pub fn extract_into(&self, target_descriptor: &DescriptorRef, target: &mut [u8]) -> bool {
        let Some(storage) = &self.storage else {
            return false;
        };
        if !same_descriptor(storage.descriptor(), target_descriptor) {
            tracing::debug!(
                boxed = storage.descriptor().type_id(),
                requested = target_descriptor.type_id(),
                "struct container type mismatch"
            );
            return false;
        }
        if target.len() != storage.bytes().len() {
            return false;
        }
        storage.copy_to(target);
        true
    }

    /// Replace the content with a semantic copy of `source`, an instance of
    /// `source_descriptor`. Fails without touching the container only when
    /// `source` has the wrong size.
    pub fn inject_from(&mut self, source_descriptor: &DescriptorRef, source: &[u8]) -> bool {
        if source.len() != source_descriptor.size() {
            tracing::warn!(
                type_id = source_descriptor.type_id(),
                expected = source_descriptor.size(),
                actual = source.len(),
                "refusing to inject a struct of the wrong size"
            );
            return false;
        }
        self.unbind();
        self.storage = Some(OwnedStorage::copy_of(source_descriptor.clone(), source));
        true
    }

    /// Deep equality: same type by identity, and equal payloads
    pub fn equals(&self, other: &StructContainer, flags: CompareFlags) -> bool {
        match (&self.storage, &other.storage) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                same_descriptor(a.descriptor(), b.descriptor()) && a.compare(b.bytes(), flags)
            }
            _ => false,
        }
    }

    /// Write the container to, or read it from, `ar`.
    ///
    /// Layout: descriptor identity, presence flag, then the payload if the
    /// flag is set. When loading, the flag decides whether a payload follows.
    /// A changed type drops the old content, a set flag binds the read type
    /// when nothing is held, and a cleared flag leaves the container empty.
    pub fn serialize(&mut self, ar: &mut dyn Archive) -> Result<(), ArchiveError> {
        let mut descriptor = self.descriptor().cloned();
        ar.serialize_descriptor(&mut descriptor)?;
        let mut present = self.is_populated();
        ar.serialize_bool(&mut present)?;

        if ar.is_loading() {
            if !present || !same_descriptor_opt(descriptor.as_ref(), self.descriptor()) {
                self.unbind();
            }
            if present && self.storage.is_none() {
                match descriptor {
                    Some(descriptor) => self.bind(descriptor),
                    None => tracing::warn!("struct container flagged present without a type"),
                }
            }
        }

        if present {
            if let Some(storage) = &mut self.storage {
                storage.serialize(ar)?;
            }
        }
        Ok(())
    }

    /// Read-only view of the payload
    pub fn to_value(&self) -> Option<Value> {
        self.storage
            .as_ref()
            .map(|s| s.descriptor().to_value(s.bytes()))
    }

    /// Read one payload field by exact or friendly name
    pub fn field(&self, name: &str) -> Option<Value> {
        let storage = self.storage.as_ref()?;
        storage.descriptor().field_value(storage.bytes(), name)
    }

    /// Overwrite one payload field by exact or friendly name
    pub fn set_field(&mut self, name: &str, value: &Value) -> Result<(), FieldError> {
        let Some(storage) = &mut self.storage else {
            return Err(FieldError::NoFields("<empty>".to_string()));
        };
        let descriptor = storage.descriptor().clone();
        descriptor.set_field_value(storage.bytes_mut(), name, value)
    }
}

impl Clone for StructContainer {
    fn clone(&self) -> Self {
        let mut container = Self::new();
        container.assign(self);
        container
    }
}

impl PartialEq for StructContainer {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, CompareFlags::NONE)
    }
}

impl fmt::Debug for StructContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.storage {
            Some(storage) => fmt::Debug::fmt(storage, f),
            None => f.write_str("StructContainer(empty)"),
        }
    }
}
