//! Primitive element types: booleans, 32-bit integers and 32-bit reals.

use blueprint_types::{PinType, Value, ValueConversionError};

use crate::archive::{Archive, ArchiveError};
use crate::descriptor::{CompareFlags, FieldError, TypeDescriptor};

/// The primitive kinds a struct field or array element can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Integer,
    Real,
}

impl ScalarKind {
    /// Storage bytes (little-endian for the numeric kinds)
    pub fn size(self) -> usize {
        match self {
            ScalarKind::Boolean => 1,
            ScalarKind::Integer | ScalarKind::Real => 4,
        }
    }

    pub fn pin_type(self) -> PinType {
        match self {
            ScalarKind::Boolean => PinType::Boolean,
            ScalarKind::Integer => PinType::Integer,
            ScalarKind::Real => PinType::Real,
        }
    }

    /// The kind behind a pin type, if it is a scalar one
    pub fn from_pin_type(pin_type: &PinType) -> Option<Self> {
        match pin_type {
            PinType::Boolean => Some(ScalarKind::Boolean),
            PinType::Integer => Some(ScalarKind::Integer),
            PinType::Real => Some(ScalarKind::Real),
            _ => None,
        }
    }

    pub(crate) fn read(self, buf: &[u8]) -> Value {
        match self {
            ScalarKind::Boolean => Value::Bool(buf[0] != 0),
            ScalarKind::Integer => Value::from(read_i32(buf)),
            ScalarKind::Real => Value::from(read_f32(buf)),
        }
    }

    pub(crate) fn write(self, buf: &mut [u8], value: &Value) -> Result<(), ValueConversionError> {
        match self {
            ScalarKind::Boolean => buf[0] = bool::try_from(value)? as u8,
            ScalarKind::Integer => buf[..4].copy_from_slice(&i32::try_from(value)?.to_le_bytes()),
            ScalarKind::Real => buf[..4].copy_from_slice(&f32::try_from(value)?.to_le_bytes()),
        }
        Ok(())
    }

    pub(crate) fn equal(self, a: &[u8], b: &[u8]) -> bool {
        match self {
            ScalarKind::Boolean => (a[0] != 0) == (b[0] != 0),
            ScalarKind::Integer => read_i32(a) == read_i32(b),
            ScalarKind::Real => read_f32(a) == read_f32(b),
        }
    }

    pub(crate) fn serialize(self, ar: &mut dyn Archive, buf: &mut [u8]) -> Result<(), ArchiveError> {
        match self {
            ScalarKind::Boolean => {
                let mut v = buf[0] != 0;
                ar.serialize_bool(&mut v)?;
                buf[0] = v as u8;
            }
            ScalarKind::Integer => {
                let mut v = read_i32(buf);
                ar.serialize_i32(&mut v)?;
                buf[..4].copy_from_slice(&v.to_le_bytes());
            }
            ScalarKind::Real => {
                let mut v = read_f32(buf);
                ar.serialize_f32(&mut v)?;
                buf[..4].copy_from_slice(&v.to_le_bytes());
            }
        }
        Ok(())
    }
}

fn read_i32(buf: &[u8]) -> i32 {
    i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

fn read_f32(buf: &[u8]) -> f32 {
    f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

// ─────────────────────────────────────────────────────────────────────────────
// Scalar Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Descriptor for a single primitive value, e.g. the element type of an
/// integer array. Owns no resources, so construct and destroy are trivial.
#[derive(Debug)]
pub struct ScalarDescriptor {
    type_id: String,
    kind: ScalarKind,
}

impl ScalarDescriptor {
    pub fn new(type_id: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            type_id: type_id.into(),
            kind,
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }
}

impl TypeDescriptor for ScalarDescriptor {
    fn type_id(&self) -> &str {
        &self.type_id
    }

    fn pin_type(&self) -> PinType {
        self.kind.pin_type()
    }

    fn size(&self) -> usize {
        self.kind.size()
    }

    fn construct(&self, buf: &mut [u8]) {
        buf.fill(0);
    }

    fn destroy(&self, _buf: &mut [u8]) {}

    fn copy(&self, dst: &mut [u8], src: &[u8]) {
        dst.copy_from_slice(src);
    }

    fn compare_equal(&self, a: &[u8], b: &[u8], _flags: CompareFlags) -> bool {
        self.kind.equal(a, b)
    }

    fn serialize(&self, ar: &mut dyn Archive, buf: &mut [u8]) -> Result<(), ArchiveError> {
        self.kind.serialize(ar, buf)
    }

    fn to_value(&self, buf: &[u8]) -> Value {
        self.kind.read(buf)
    }

    fn write_value(&self, buf: &mut [u8], value: &Value) -> Result<(), FieldError> {
        self.kind
            .write(buf, value)
            .map_err(|source| FieldError::Conversion {
                field: self.type_id.clone(),
                source,
            })
    }
}
