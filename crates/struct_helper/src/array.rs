//! Script arrays of described elements.

use std::fmt;

use blueprint_types::Value;

use crate::descriptor::{DescriptorRef, FieldError};

/// A contiguous sequence of fixed-size opaque elements
pub trait ArrayView {
    /// Number of elements
    fn len(&self) -> usize;

    /// Bytes per element
    fn element_size(&self) -> usize;

    /// Bytes of element `index`. Panics when out of bounds.
    fn raw(&self, index: usize) -> &[u8];

    /// Exchange two elements in place
    fn swap(&mut self, a: usize, b: usize);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resizable array whose elements are instances of one descriptor
pub struct ScriptArray {
    element: DescriptorRef,
    data: Vec<u8>,
    len: usize,
}

impl ScriptArray {
    pub fn new(element: DescriptorRef) -> Self {
        Self {
            element,
            data: Vec::new(),
            len: 0,
        }
    }

    /// Build an array of values, e.g. `[5, 3, 4]` for an integer array
    pub fn from_values<'a>(
        element: DescriptorRef,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> Result<Self, FieldError> {
        let mut array = Self::new(element);
        for value in values {
            array.push_value(value)?;
        }
        Ok(array)
    }

    pub fn element_descriptor(&self) -> &DescriptorRef {
        &self.element
    }

    fn range(&self, index: usize) -> std::ops::Range<usize> {
        let size = self.element.size();
        index * size..(index + 1) * size
    }

    /// Append a default-constructed element and return its index
    pub fn push_default(&mut self) -> usize {
        let index = self.len;
        self.data.resize(self.data.len() + self.element.size(), 0);
        let range = self.range(index);
        self.element.construct(&mut self.data[range]);
        self.len += 1;
        index
    }

    /// Append a semantic copy of an instance of the element type.
    /// Returns false, leaving the array unchanged, when `src` has the wrong size.
    pub fn push_copy(&mut self, src: &[u8]) -> bool {
        if src.len() != self.element.size() {
            return false;
        }
        let index = self.push_default();
        let range = self.range(index);
        self.element.copy(&mut self.data[range], src);
        true
    }

    /// Append an element built from `value`. Nothing is appended on error.
    pub fn push_value(&mut self, value: &Value) -> Result<usize, FieldError> {
        let index = self.push_default();
        let range = self.range(index);
        if let Err(err) = self.element.write_value(&mut self.data[range], value) {
            self.pop();
            return Err(err);
        }
        Ok(index)
    }

    /// Destroy and remove the last element
    pub fn pop(&mut self) -> bool {
        if self.len == 0 {
            return false;
        }
        let range = self.range(self.len - 1);
        self.element.destroy(&mut self.data[range.clone()]);
        self.data.truncate(range.start);
        self.len -= 1;
        true
    }

    /// Destroy every element
    pub fn clear(&mut self) {
        while self.pop() {}
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        (index < self.len).then(|| &self.data[self.range(index)])
    }

    /// Element `index` as a `Value`
    pub fn value_at(&self, index: usize) -> Option<Value> {
        self.get(index).map(|bytes| self.element.to_value(bytes))
    }

    /// Every element as a `Value`, in order
    pub fn values(&self) -> Vec<Value> {
        (0..self.len).filter_map(|i| self.value_at(i)).collect()
    }
}

impl ArrayView for ScriptArray {
    fn len(&self) -> usize {
        self.len
    }

    fn element_size(&self) -> usize {
        self.element.size()
    }

    fn raw(&self, index: usize) -> &[u8] {
        assert!(index < self.len, "index {index} out of bounds for length {}", self.len);
        &self.data[self.range(index)]
    }

    fn swap(&mut self, a: usize, b: usize) {
        assert!(a < self.len && b < self.len, "swap out of bounds");
        if a == b {
            return;
        }
        let (low, high) = (a.min(b), a.max(b));
        let size = self.element.size();
        let (head, tail) = self.data.split_at_mut(high * size);
        head[low * size..(low + 1) * size].swap_with_slice(&mut tail[..size]);
    }
}

impl Drop for ScriptArray {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for ScriptArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptArray")
            .field("element", &self.element.type_id())
            .field("values", &self.values())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use blueprint_types::{FieldDef, PinType, TypeDef};

    use super::*;
    use crate::registry::DescriptorRegistry;

    #[test]
    fn test_integer_array() {
        let registry = DescriptorRegistry::new();
        let ints: Vec<Value> = [5, 3, 4].into_iter().map(Value::from).collect();
        let mut array = ScriptArray::from_values(registry.get("Integer").unwrap(), &ints).unwrap();

        assert_eq!(array.len(), 3);
        assert_eq!(array.element_size(), 4);
        assert_eq!(array.raw(1), 3i32.to_le_bytes());

        array.swap(0, 2);
        assert_eq!(array.values(), vec![Value::Int(4), Value::Int(3), Value::Int(5)]);
        assert!(array.get(3).is_none());
    }

    #[test]
    fn test_push_value_failure_appends_nothing() {
        let registry = DescriptorRegistry::new();
        let mut array = ScriptArray::new(registry.get("Integer").unwrap());
        assert!(array.push_value(&Value::from("x")).is_err());
        assert!(array.is_empty());
        assert!(!array.push_copy(&[1, 2]));
    }

    #[test]
    fn test_struct_elements_release_strings() {
        let registry = DescriptorRegistry::new();
        let named = registry
            .register_struct(&TypeDef::new("t/Named", "Named").add_field(FieldDef::new("Name", PinType::String)))
            .unwrap();

        let mut array = ScriptArray::new(registry.get("t/Named").unwrap());
        for name in ["a", "b", "c"] {
            array
                .push_value(&Value::from(serde_json::json!({ "Name": name })))
                .unwrap();
        }
        array.swap(0, 2);
        assert_eq!(
            array.value_at(0).and_then(|v| v.get("Name").cloned()),
            Some(Value::from("c"))
        );
        assert_eq!(named.live_strings(), 3);

        let copy_source = array.get(1).unwrap().to_vec();
        assert!(array.push_copy(&copy_source));
        assert_eq!(named.live_strings(), 4);

        array.pop();
        assert_eq!(named.live_strings(), 3);
        drop(array);
        assert_eq!(named.live_strings(), 0);
    }
}
