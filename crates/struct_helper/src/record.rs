//! Struct descriptors compiled from user-defined type definitions.
//!
//! Fields are packed back to back in definition order with no padding:
//!
//! | field type | bytes | encoding |
//! |------------|-------|----------|
//! | Boolean    | 1     | 0 / 1 |
//! | Integer    | 4     | i32 LE |
//! | Real       | 4     | f32 LE |
//! | String     | 4     | u32 LE handle into the descriptor's string pool, 0 = none |
//! | Struct     | n     | nested struct inline |
//!
//! String handles are owned resources: construct allocates one, destroy
//! releases it and copy duplicates the text rather than the handle.

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use blueprint_types::{PinType, TypeDef, Value};
use parking_lot::Mutex;

use crate::archive::{Archive, ArchiveError};
use crate::descriptor::{CompareFlags, DescriptorRef, FieldError, TypeDescriptor};
use crate::friendly_name::matches_field;
use crate::registry::RegistryError;
use crate::scalar::ScalarKind;
use crate::storage::OwnedStorage;

const HANDLE_SIZE: usize = 4;

// ─────────────────────────────────────────────────────────────────────────────
// String Pool
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PoolSlots {
    slots: Vec<Option<String>>,
    free: Vec<usize>,
    live: usize,
}

/// Heap for the strings of every instance of one struct type
#[derive(Debug, Default)]
struct StringPool {
    inner: Mutex<PoolSlots>,
}

impl StringPool {
    fn alloc(&self, value: String) -> u32 {
        let mut pool = self.inner.lock();
        pool.live += 1;
        let index = match pool.free.pop() {
            Some(index) => {
                pool.slots[index] = Some(value);
                index
            }
            None => {
                pool.slots.push(Some(value));
                pool.slots.len() - 1
            }
        };
        index as u32 + 1
    }

    fn release(&self, handle: u32) {
        let mut pool = self.inner.lock();
        let Some(index) = (handle as usize).checked_sub(1) else {
            return;
        };
        if let Some(slot) = pool.slots.get_mut(index) {
            if slot.take().is_some() {
                pool.live -= 1;
                pool.free.push(index);
            }
        }
    }

    fn with<R>(&self, handle: u32, f: impl FnOnce(&str) -> R) -> R {
        let pool = self.inner.lock();
        f(slot_ref(&pool, handle).unwrap_or(""))
    }

    fn with_pair<R>(&self, a: u32, b: u32, f: impl FnOnce(&str, &str) -> R) -> R {
        let pool = self.inner.lock();
        f(
            slot_ref(&pool, a).unwrap_or(""),
            slot_ref(&pool, b).unwrap_or(""),
        )
    }

    fn set(&self, handle: u32, value: String) {
        let mut pool = self.inner.lock();
        if let Some(Some(slot)) = (handle as usize)
            .checked_sub(1)
            .and_then(|index| pool.slots.get_mut(index))
        {
            *slot = value;
        }
    }

    fn duplicate(&self, dst: u32, src: u32) {
        if dst == src {
            return;
        }
        let value = self.with(src, str::to_string);
        self.set(dst, value);
    }

    fn live(&self) -> usize {
        self.inner.lock().live
    }
}

fn slot_ref(pool: &PoolSlots, handle: u32) -> Option<&str> {
    let index = (handle as usize).checked_sub(1)?;
    pool.slots.get(index)?.as_deref()
}

fn read_handle(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

fn write_handle(buf: &mut [u8], handle: u32) {
    buf[..HANDLE_SIZE].copy_from_slice(&handle.to_le_bytes());
}

// ─────────────────────────────────────────────────────────────────────────────
// Field Layout
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum FieldKind {
    Scalar(ScalarKind),
    String,
    Struct(DescriptorRef),
}

#[derive(Debug)]
struct FieldLayout {
    name: String,
    kind: FieldKind,
    offset: usize,
    size: usize,
    default: Option<Value>,
}

impl FieldLayout {
    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.size
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Struct Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime descriptor for a user-defined struct
#[derive(Debug)]
pub struct StructDescriptor {
    id: String,
    name: String,
    fields: Vec<FieldLayout>,
    size: usize,
    strings: StringPool,
}

impl StructDescriptor {
    /// Compile a definition. Nested struct fields are resolved through `lookup`,
    /// which must already know every type the definition embeds.
    pub fn compile(
        def: &TypeDef,
        lookup: impl Fn(&str) -> Option<DescriptorRef>,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(def.fields.len());
        let mut offset = 0;

        for field in &def.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(RegistryError::DuplicateField {
                    type_id: def.id.clone(),
                    field: field.name.clone(),
                });
            }

            let (kind, size) = match &field.field_type {
                PinType::String => (FieldKind::String, HANDLE_SIZE),
                PinType::Struct { struct_id } => {
                    let nested = lookup(struct_id.as_str())
                        .ok_or_else(|| RegistryError::TypeNotFound(struct_id.clone()))?;
                    let size = nested.size();
                    (FieldKind::Struct(nested), size)
                }
                other => match ScalarKind::from_pin_type(other) {
                    Some(kind) => (FieldKind::Scalar(kind), kind.size()),
                    None => {
                        return Err(RegistryError::UnsupportedFieldType {
                            type_id: def.id.clone(),
                            field: field.name.clone(),
                            field_type: other.clone(),
                        });
                    }
                },
            };

            let layout = FieldLayout {
                name: field.name.clone(),
                kind,
                offset,
                size,
                default: field.default.clone().map(Value::from),
            };
            validate_default(&def.id, &layout)?;
            offset += size;
            fields.push(layout);
        }

        Ok(Self {
            id: def.id.clone(),
            name: def.name.clone(),
            fields,
            size: offset,
            strings: StringPool::default(),
        })
    }

    /// Human-readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored field names, in layout order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Strings currently allocated by live instances of this type
    pub fn live_strings(&self) -> usize {
        self.strings.live()
    }

    fn find_field(&self, query: &str) -> Option<&FieldLayout> {
        self.fields
            .iter()
            .find(|f| f.name == query)
            .or_else(|| self.fields.iter().find(|f| matches_field(&f.name, query)))
    }

    fn read_field(&self, field: &FieldLayout, buf: &[u8]) -> Value {
        let slot = &buf[field.range()];
        match &field.kind {
            FieldKind::Scalar(kind) => kind.read(slot),
            FieldKind::String => self
                .strings
                .with(read_handle(slot), |s| Value::String(s.to_string())),
            FieldKind::Struct(nested) => nested.to_value(slot),
        }
    }

    fn write_field(&self, field: &FieldLayout, buf: &mut [u8], value: &Value) -> Result<(), FieldError> {
        let slot = &mut buf[field.range()];
        let conversion = |source| FieldError::Conversion {
            field: field.name.clone(),
            source,
        };
        match &field.kind {
            FieldKind::Scalar(kind) => kind.write(slot, value).map_err(conversion),
            FieldKind::String => {
                let text = String::try_from(value).map_err(conversion)?;
                self.strings.set(read_handle(slot), text);
                Ok(())
            }
            FieldKind::Struct(nested) => nested.write_value(slot, value),
        }
    }
}

/// Check a field default against the field's type by writing it into a
/// scratch instance.
fn validate_default(type_id: &str, field: &FieldLayout) -> Result<(), RegistryError> {
    let Some(default) = &field.default else {
        return Ok(());
    };
    let invalid = |reason: String| RegistryError::InvalidDefault {
        type_id: type_id.to_string(),
        field: field.name.clone(),
        reason,
    };
    match &field.kind {
        FieldKind::Scalar(kind) => {
            let mut scratch = vec![0u8; kind.size()];
            kind.write(&mut scratch, default).map_err(|e| invalid(e.to_string()))
        }
        FieldKind::String => match default {
            Value::String(_) => Ok(()),
            other => Err(invalid(format!("expected string, got {}", other.type_name()))),
        },
        FieldKind::Struct(nested) => {
            let mut scratch = OwnedStorage::new(nested.clone());
            nested
                .write_value(scratch.bytes_mut(), default)
                .map_err(|e| invalid(e.to_string()))
        }
    }
}

impl TypeDescriptor for StructDescriptor {
    fn type_id(&self) -> &str {
        &self.id
    }

    fn pin_type(&self) -> PinType {
        PinType::structure(self.id.clone())
    }

    fn size(&self) -> usize {
        self.size
    }

    fn construct(&self, buf: &mut [u8]) {
        for field in &self.fields {
            let slot = &mut buf[field.range()];
            // Defaults were checked in `compile`, writes cannot fail here.
            match &field.kind {
                FieldKind::Scalar(kind) => {
                    if let Some(default) = &field.default {
                        let _ = kind.write(slot, default);
                    }
                }
                FieldKind::String => {
                    let text = field
                        .default
                        .as_ref()
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    write_handle(slot, self.strings.alloc(text.to_string()));
                }
                FieldKind::Struct(nested) => {
                    nested.construct(slot);
                    if let Some(default) = &field.default {
                        let _ = nested.write_value(slot, default);
                    }
                }
            }
        }
    }

    fn destroy(&self, buf: &mut [u8]) {
        for field in &self.fields {
            let slot = &mut buf[field.range()];
            match &field.kind {
                FieldKind::Scalar(_) => {}
                FieldKind::String => {
                    self.strings.release(read_handle(slot));
                    write_handle(slot, 0);
                }
                FieldKind::Struct(nested) => nested.destroy(slot),
            }
        }
    }

    fn copy(&self, dst: &mut [u8], src: &[u8]) {
        for field in &self.fields {
            let range = field.range();
            match &field.kind {
                FieldKind::Scalar(_) => dst[range.clone()].copy_from_slice(&src[range]),
                FieldKind::String => self
                    .strings
                    .duplicate(read_handle(&dst[range.clone()]), read_handle(&src[range])),
                FieldKind::Struct(nested) => nested.copy(&mut dst[range.clone()], &src[range]),
            }
        }
    }

    fn compare_equal(&self, a: &[u8], b: &[u8], flags: CompareFlags) -> bool {
        self.fields.iter().all(|field| {
            let (a, b) = (&a[field.range()], &b[field.range()]);
            match &field.kind {
                FieldKind::Scalar(kind) => kind.equal(a, b),
                FieldKind::String => {
                    self.strings
                        .with_pair(read_handle(a), read_handle(b), |a, b| {
                            if flags.contains(CompareFlags::IGNORE_CASE) {
                                a.eq_ignore_ascii_case(b)
                            } else {
                                a == b
                            }
                        })
                }
                FieldKind::Struct(nested) => nested.compare_equal(a, b, flags),
            }
        })
    }

    fn serialize(&self, ar: &mut dyn Archive, buf: &mut [u8]) -> Result<(), ArchiveError> {
        for field in &self.fields {
            let slot = &mut buf[field.range()];
            match &field.kind {
                FieldKind::Scalar(kind) => kind.serialize(ar, slot)?,
                FieldKind::String => {
                    let handle = read_handle(slot);
                    let mut text = self.strings.with(handle, str::to_string);
                    ar.serialize_string(&mut text)?;
                    if ar.is_loading() {
                        self.strings.set(handle, text);
                    }
                }
                FieldKind::Struct(nested) => nested.serialize(ar, slot)?,
            }
        }
        Ok(())
    }

    fn to_value(&self, buf: &[u8]) -> Value {
        let fields: BTreeMap<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), self.read_field(field, buf)))
            .collect();
        Value::Object {
            type_id: Some(self.id.clone()),
            fields,
        }
    }

    fn write_value(&self, buf: &mut [u8], value: &Value) -> Result<(), FieldError> {
        let fields = value.as_object().ok_or_else(|| FieldError::NotAnObject {
            type_id: self.id.clone(),
            actual: value.type_name(),
        })?;
        for (name, field_value) in fields {
            self.set_field_value(buf, name, field_value)?;
        }
        Ok(())
    }

    fn field_value(&self, buf: &[u8], name: &str) -> Option<Value> {
        self.find_field(name).map(|field| self.read_field(field, buf))
    }

    fn set_field_value(&self, buf: &mut [u8], name: &str, value: &Value) -> Result<(), FieldError> {
        let field = self.find_field(name).ok_or_else(|| FieldError::UnknownField {
            type_id: self.id.clone(),
            name: name.to_string(),
        })?;
        self.write_field(field, buf, value)
    }
}
