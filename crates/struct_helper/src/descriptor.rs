//! Runtime type descriptors
//!
//! A descriptor is the only thing that knows how the bytes of a boxed value
//! are laid out. Everything else in this crate moves opaque byte buffers
//! around and dispatches through the descriptor it was handed.

use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use blueprint_types::{PinType, Value, ValueConversionError};

use crate::archive::{Archive, ArchiveError};

/// Shared, non-owning handle to a descriptor. The registry outlives every box.
pub type DescriptorRef = Arc<dyn TypeDescriptor>;

/// Identity comparison. Two structurally identical descriptors are still
/// different types.
pub fn same_descriptor(a: &DescriptorRef, b: &DescriptorRef) -> bool {
    Arc::ptr_eq(a, b)
}

/// Identity comparison over optional descriptors. Two `None`s are the same.
pub fn same_descriptor_opt(a: Option<&DescriptorRef>, b: Option<&DescriptorRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_descriptor(a, b),
        (None, None) => true,
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compare Flags
// ─────────────────────────────────────────────────────────────────────────────

/// Flags forwarded to [`TypeDescriptor::compare_equal`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CompareFlags(u32);

impl CompareFlags {
    pub const NONE: CompareFlags = CompareFlags(0);
    /// String fields compare without regard to ASCII case
    pub const IGNORE_CASE: CompareFlags = CompareFlags(1 << 0);

    pub fn contains(self, other: CompareFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for CompareFlags {
    type Output = CompareFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        CompareFlags(self.0 | rhs.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised when writing a `Value` into a described buffer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("Type {type_id} has no field named {name}")]
    UnknownField { type_id: String, name: String },
    #[error("Type {0} has no addressable fields")]
    NoFields(String),
    #[error("Field {field}: {source}")]
    Conversion {
        field: String,
        #[source]
        source: ValueConversionError,
    },
    #[error("Expected an object for {type_id}, got {actual}")]
    NotAnObject {
        type_id: String,
        actual: &'static str,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Type Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Capability interface over an externally described record type.
///
/// Every method that takes a buffer expects exactly [`size`](Self::size)
/// bytes. `destroy`, `copy`, `compare_equal`, `serialize` and the value
/// accessors additionally expect a buffer that `construct` has initialised.
pub trait TypeDescriptor: Send + Sync + fmt::Debug {
    /// Name the host uses for this type. Written to archives as its identity.
    fn type_id(&self) -> &str;

    /// Pin type of one instance, used to validate script signatures
    fn pin_type(&self) -> PinType;

    /// Storage bytes needed for one instance
    fn size(&self) -> usize;

    /// Initialise zeroed storage into a valid instance
    fn construct(&self, buf: &mut [u8]);

    /// Release everything the instance owns. The bytes are garbage afterwards.
    fn destroy(&self, buf: &mut [u8]);

    /// Semantic copy of `src` over the already constructed `dst`
    fn copy(&self, dst: &mut [u8], src: &[u8]);

    fn compare_equal(&self, a: &[u8], b: &[u8], flags: CompareFlags) -> bool;

    /// Write the instance to, or read it from, `ar` depending on its mode
    fn serialize(&self, ar: &mut dyn Archive, buf: &mut [u8]) -> Result<(), ArchiveError>;

    /// Read-only view of the instance
    fn to_value(&self, buf: &[u8]) -> Value;

    /// Overwrite the whole instance from `value`
    fn write_value(&self, buf: &mut [u8], value: &Value) -> Result<(), FieldError>;

    /// Read one field, matching `name` exactly or by its friendly name
    fn field_value(&self, _buf: &[u8], _name: &str) -> Option<Value> {
        None
    }

    /// Overwrite one field, matching `name` exactly or by its friendly name
    fn set_field_value(&self, _buf: &mut [u8], _name: &str, _value: &Value) -> Result<(), FieldError> {
        Err(FieldError::NoFields(self.type_id().to_string()))
    }
}
