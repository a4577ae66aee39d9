//! Bidirectional serialization streams.
//!
//! One `serialize` routine handles both directions: it passes `&mut` slots to
//! the archive, which either writes their current value or overwrites them
//! with what it reads. [`Archive::is_loading`] tells the caller which.
//!
//! The binary format is little-endian. Strings and descriptor identities are
//! a `u32` byte length followed by UTF-8; an empty identity means "no type".

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::descriptor::DescriptorRef;
use crate::registry::DescriptorRegistry;

/// Errors for archive operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArchiveError {
    #[error("Unexpected end of archive: need {need} bytes, have {have}")]
    UnexpectedEof { need: usize, have: usize },
    #[error("Invalid UTF-8 in archive string")]
    InvalidUtf8,
    #[error("Archive references unknown type: {0}")]
    UnknownType(String),
}

/// A read or write cursor over a serialized stream
pub trait Archive {
    /// True when reading, false when writing
    fn is_loading(&self) -> bool;

    fn serialize_bool(&mut self, value: &mut bool) -> Result<(), ArchiveError>;

    fn serialize_i32(&mut self, value: &mut i32) -> Result<(), ArchiveError>;

    fn serialize_f32(&mut self, value: &mut f32) -> Result<(), ArchiveError>;

    fn serialize_string(&mut self, value: &mut String) -> Result<(), ArchiveError>;

    /// Write a descriptor identity, or read one and resolve it
    fn serialize_descriptor(&mut self, value: &mut Option<DescriptorRef>) -> Result<(), ArchiveError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Writer
// ─────────────────────────────────────────────────────────────────────────────

/// Archive that appends to an in-memory buffer
#[derive(Debug, Default)]
pub struct ArchiveWriter {
    buf: BytesMut,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    fn put_str(&mut self, s: &str) {
        self.buf.put_u32_le(s.len() as u32);
        self.buf.put_slice(s.as_bytes());
    }
}

impl Archive for ArchiveWriter {
    fn is_loading(&self) -> bool {
        false
    }

    fn serialize_bool(&mut self, value: &mut bool) -> Result<(), ArchiveError> {
        self.buf.put_u8(*value as u8);
        Ok(())
    }

    fn serialize_i32(&mut self, value: &mut i32) -> Result<(), ArchiveError> {
        self.buf.put_i32_le(*value);
        Ok(())
    }

    fn serialize_f32(&mut self, value: &mut f32) -> Result<(), ArchiveError> {
        self.buf.put_f32_le(*value);
        Ok(())
    }

    fn serialize_string(&mut self, value: &mut String) -> Result<(), ArchiveError> {
        self.put_str(value);
        Ok(())
    }

    fn serialize_descriptor(&mut self, value: &mut Option<DescriptorRef>) -> Result<(), ArchiveError> {
        let id = value.as_ref().map(|d| d.type_id()).unwrap_or("");
        self.buf.put_u32_le(id.len() as u32);
        self.buf.put_slice(id.as_bytes());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reader
// ─────────────────────────────────────────────────────────────────────────────

/// Archive that reads from a byte slice, resolving types through a registry
pub struct ArchiveReader<'a> {
    buf: &'a [u8],
    registry: &'a DescriptorRegistry,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(buf: &'a [u8], registry: &'a DescriptorRegistry) -> Self {
        Self { buf, registry }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, need: usize) -> Result<(), ArchiveError> {
        let have = self.buf.remaining();
        if have < need {
            return Err(ArchiveError::UnexpectedEof { need, have });
        }
        Ok(())
    }

    fn get_str(&mut self) -> Result<String, ArchiveError> {
        self.ensure(4)?;
        let len = self.buf.get_u32_le() as usize;
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        let s = std::str::from_utf8(head).map_err(|_| ArchiveError::InvalidUtf8)?;
        self.buf = tail;
        Ok(s.to_string())
    }
}

impl Archive for ArchiveReader<'_> {
    fn is_loading(&self) -> bool {
        true
    }

    fn serialize_bool(&mut self, value: &mut bool) -> Result<(), ArchiveError> {
        self.ensure(1)?;
        *value = self.buf.get_u8() != 0;
        Ok(())
    }

    fn serialize_i32(&mut self, value: &mut i32) -> Result<(), ArchiveError> {
        self.ensure(4)?;
        *value = self.buf.get_i32_le();
        Ok(())
    }

    fn serialize_f32(&mut self, value: &mut f32) -> Result<(), ArchiveError> {
        self.ensure(4)?;
        *value = self.buf.get_f32_le();
        Ok(())
    }

    fn serialize_string(&mut self, value: &mut String) -> Result<(), ArchiveError> {
        *value = self.get_str()?;
        Ok(())
    }

    fn serialize_descriptor(&mut self, value: &mut Option<DescriptorRef>) -> Result<(), ArchiveError> {
        let id = self.get_str()?;
        if id.is_empty() {
            *value = None;
            return Ok(());
        }
        let descriptor = self
            .registry
            .get(&id)
            .ok_or(ArchiveError::UnknownType(id))?;
        *value = Some(descriptor);
        Ok(())
    }
}
