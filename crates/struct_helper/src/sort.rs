//! Exchange sort driven by an external comparator
//!
//! The comparator may live on the other side of a script call boundary, so it
//! never sees array memory. Each comparison hands it semantic copies of the
//! two candidate elements, and its answer only decides whether they trade
//! places.

use std::collections::HashMap;
use std::fmt;

use blueprint_types::{FunctionDef, PinType, Value};

use crate::array::{ArrayView, ScriptArray};
use crate::descriptor::DescriptorRef;
use crate::storage::OwnedStorage;

/// Reasons a sort is skipped. The array is untouched in every case.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SortError {
    #[error("No owner object to resolve comparator {0} on")]
    MissingOwner(String),
    #[error("Owner {owner} has no function named {function}")]
    UnknownFunction { owner: String, function: String },
    #[error("Comparator {function} takes {inputs} inputs and {outputs} outputs, expected 2 and 1")]
    ArityMismatch {
        function: String,
        inputs: usize,
        outputs: usize,
    },
    #[error("Comparator {function} returns {actual}, expected Boolean")]
    ReturnNotBoolean { function: String, actual: PinType },
    #[error("Comparator {function} parameter {param} is {actual}, array holds {expected}")]
    ParameterMismatch {
        function: String,
        param: String,
        expected: PinType,
        actual: PinType,
    },
    #[error("Descriptor {type_id} is {descriptor_size} bytes, array elements are {element_size}")]
    LayoutMismatch {
        type_id: String,
        descriptor_size: usize,
        element_size: usize,
    },
}

/// Sort `array` in place, swapping neighbours whenever `should_swap` says so
///
/// `element` must describe the array's element layout. The predicate gets
/// copies of elements `j` and `j + 1` made through `element`, so owned
/// resources such as strings are duplicated too. Writes to them are discarded.
pub fn exchange_sort<A, F>(array: &mut A, element: &DescriptorRef, mut should_swap: F) -> Result<(), SortError>
where
    A: ArrayView + ?Sized,
    F: FnMut(&mut [u8], &mut [u8]) -> bool,
{
    let size = array.element_size();
    if element.size() != size {
        let err = SortError::LayoutMismatch {
            type_id: element.type_id().to_string(),
            descriptor_size: element.size(),
            element_size: size,
        };
        tracing::warn!(error = %err, "Sort skipped");
        return Err(err);
    }

    let n = array.len();
    if n < 2 {
        return Ok(());
    }

    let mut left = OwnedStorage::new(element.clone());
    let mut right = OwnedStorage::new(element.clone());
    let mut swaps = 0usize;
    for i in 0..n {
        for j in 0..n - i - 1 {
            left.copy_from(array.raw(j));
            right.copy_from(array.raw(j + 1));
            if should_swap(left.bytes_mut(), right.bytes_mut()) {
                array.swap(j, j + 1);
                swaps += 1;
            }
        }
    }

    tracing::trace!(type_id = element.type_id(), len = n, swaps, "Exchange sort finished");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Script Functions
// ─────────────────────────────────────────────────────────────────────────────

type ComparatorBody = Box<dyn FnMut(&mut [u8], &mut [u8]) -> Value + Send>;

/// A callable exposed by a script object, with the signature it advertises
pub struct ScriptFunction {
    def: FunctionDef,
    body: ComparatorBody,
}

impl ScriptFunction {
    pub fn new(def: FunctionDef, body: impl FnMut(&mut [u8], &mut [u8]) -> Value + Send + 'static) -> Self {
        Self {
            def,
            body: Box::new(body),
        }
    }

    pub fn def(&self) -> &FunctionDef {
        &self.def
    }

    pub fn call(&mut self, a: &mut [u8], b: &mut [u8]) -> Value {
        (self.body)(a, b)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction").field("def", &self.def).finish_non_exhaustive()
    }
}

/// Object whose functions can be looked up by name
#[derive(Debug, Default)]
pub struct ScriptObject {
    name: String,
    functions: HashMap<String, ScriptFunction>,
}

impl ScriptObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a function, replacing any previous one with the same name
    pub fn add_function(&mut self, function: ScriptFunction) {
        self.functions.insert(function.def.name.clone(), function);
    }

    pub fn with_function(mut self, function: ScriptFunction) -> Self {
        self.add_function(function);
        self
    }

    pub fn find_function_mut(&mut self, name: &str) -> Option<&mut ScriptFunction> {
        self.functions.get_mut(name)
    }
}

/// Check that `def` can compare two elements of type `element`
fn check_comparator(def: &FunctionDef, element: &PinType) -> Result<(), SortError> {
    let output = match def.return_type() {
        Some(output) if def.param_count() == 3 => output,
        _ => {
            return Err(SortError::ArityMismatch {
                function: def.name.clone(),
                inputs: def.inputs.len(),
                outputs: def.outputs.len(),
            });
        }
    };
    if *output != PinType::Boolean {
        return Err(SortError::ReturnNotBoolean {
            function: def.name.clone(),
            actual: output.clone(),
        });
    }

    // Integer and Real share a width but not a bit layout, so no coercion here
    for param in &def.inputs {
        if param.param_type != PinType::Any && param.param_type != *element {
            return Err(SortError::ParameterMismatch {
                function: def.name.clone(),
                param: param.name.clone(),
                expected: element.clone(),
                actual: param.param_type.clone(),
            });
        }
    }
    Ok(())
}

/// Sort `array` with the comparator named `function_name` on `owner`
///
/// The comparator is resolved and its signature checked before any element is
/// touched. A comparator result other than `true` means "keep the order".
pub fn sort_by_function(
    array: &mut ScriptArray,
    owner: Option<&mut ScriptObject>,
    function_name: &str,
) -> Result<(), SortError> {
    let element = array.element_descriptor().clone();

    let resolved = match owner {
        None => Err(SortError::MissingOwner(function_name.to_string())),
        Some(owner) => {
            let owner_name = owner.name.clone();
            owner
                .find_function_mut(function_name)
                .ok_or(SortError::UnknownFunction {
                    owner: owner_name,
                    function: function_name.to_string(),
                })
        }
    };
    let function = match resolved.and_then(|f| check_comparator(&f.def, &element.pin_type()).map(|_| f)) {
        Ok(function) => function,
        Err(err) => {
            tracing::warn!(error = %err, "Sort skipped");
            return Err(err);
        }
    };

    tracing::debug!(
        function = function_name,
        element = element.type_id(),
        len = array.len(),
        "Sorting array"
    );
    exchange_sort(array, &element, |a, b| {
        function.call(a, b).as_bool().unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use blueprint_types::{FieldDef, TypeDef};

    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::registry::DescriptorRegistry;

    fn int(bytes: &[u8]) -> i32 {
        i32::from_le_bytes(bytes.try_into().unwrap())
    }

    fn ints(registry: &DescriptorRegistry, values: &[i32]) -> ScriptArray {
        crate::test_support::init_tracing();
        let values: Vec<Value> = values.iter().copied().map(Value::from).collect();
        ScriptArray::from_values(registry.get("Integer").unwrap(), &values).unwrap()
    }

    fn read_ints(array: &ScriptArray) -> Vec<i32> {
        array
            .values()
            .iter()
            .map(|v| i32::try_from(v).unwrap())
            .collect()
    }

    fn comparator(name: &str, input: PinType, output: PinType) -> FunctionDef {
        FunctionDef::new(name)
            .input("A", input.clone())
            .input("B", input)
            .output("Result", output)
    }

    fn ascending_owner() -> ScriptObject {
        ScriptObject::new("Sorter").with_function(ScriptFunction::new(
            comparator("Greater", PinType::Integer, PinType::Boolean),
            |a, b| Value::Bool(int(a) > int(b)),
        ))
    }

    #[test]
    fn test_descending_sort() {
        let registry = DescriptorRegistry::new();
        let mut array = ints(&registry, &[5, 3, 4, 1, 2]);
        let element = array.element_descriptor().clone();

        exchange_sort(&mut array, &element, |a, b| int(a) < int(b)).unwrap();
        assert_eq!(read_ints(&array), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_short_arrays_unchanged() {
        let registry = DescriptorRegistry::new();
        let element = registry.get("Integer").unwrap();
        for values in [vec![], vec![1i32]] {
            let mut array = ints(&registry, &values);
            let mut calls = 0;
            exchange_sort(&mut array, &element, |_, _| {
                calls += 1;
                true
            })
            .unwrap();
            assert_eq!(calls, 0);
            assert_eq!(read_ints(&array), values);
        }
    }

    #[test]
    fn test_never_swap_keeps_order() {
        let registry = DescriptorRegistry::new();
        let mut array = ints(&registry, &[9, -1, 7, 7, 0]);
        let element = array.element_descriptor().clone();

        exchange_sort(&mut array, &element, |_, _| false).unwrap();
        assert_eq!(read_ints(&array), vec![9, -1, 7, 7, 0]);
    }

    #[test]
    fn test_comparator_gets_copies() {
        let registry = DescriptorRegistry::new();
        let mut array = ints(&registry, &[3, 1, 2]);
        let element = array.element_descriptor().clone();

        exchange_sort(&mut array, &element, |a, b| {
            let swap = int(a) > int(b);
            a.fill(0xFF);
            b.fill(0xFF);
            swap
        })
        .unwrap();
        assert_eq!(read_ints(&array), vec![1, 2, 3]);
    }

    #[test]
    fn test_comparator_string_writes_stay_in_copies() {
        crate::test_support::init_tracing();
        let registry = DescriptorRegistry::new();
        let named = registry
            .register_struct(&TypeDef::new("t/Named", "Named").add_field(FieldDef::new("Name", PinType::String)))
            .unwrap();

        let mut array = ScriptArray::new(registry.get("t/Named").unwrap());
        for name in ["ann", "bob"] {
            array
                .push_value(&Value::from(serde_json::json!({ "Name": name })))
                .unwrap();
        }
        let element = array.element_descriptor().clone();

        let mut seen = Vec::new();
        exchange_sort(&mut array, &element, |a, b| {
            seen.push(named.field_value(a, "Name"));
            named.set_field_value(a, "Name", &Value::from("MUTATED")).unwrap();
            named.set_field_value(b, "Name", &Value::from("MUTATED")).unwrap();
            false
        })
        .unwrap();

        assert_eq!(seen, vec![Some(Value::from("ann"))]);
        let names: Vec<Option<Value>> = array.values().iter().map(|v| v.get("Name").cloned()).collect();
        assert_eq!(names, vec![Some(Value::from("ann")), Some(Value::from("bob"))]);
        assert_eq!(named.live_strings(), 2);
    }

    #[test]
    fn test_layout_mismatch_skips_sort() {
        let registry = DescriptorRegistry::new();
        let mut array = ints(&registry, &[2, 1]);
        let boolean = registry.get("Boolean").unwrap();

        let err = exchange_sort(&mut array, &boolean, |_, _| true).unwrap_err();
        assert!(matches!(err, SortError::LayoutMismatch { descriptor_size: 1, element_size: 4, .. }));
        assert_eq!(read_ints(&array), vec![2, 1]);
    }

    #[test]
    fn test_sort_by_function() {
        let registry = DescriptorRegistry::new();
        let mut array = ints(&registry, &[5, 3, 4, 1, 2]);
        let mut owner = ascending_owner();

        sort_by_function(&mut array, Some(&mut owner), "Greater").unwrap();
        assert_eq!(read_ints(&array), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_resolution_failures_leave_array_untouched() {
        let registry = DescriptorRegistry::new();
        let mut array = ints(&registry, &[2, 3, 1]);

        let mut owner = ascending_owner()
            .with_function(ScriptFunction::new(
                FunctionDef::new("Unary").input("A", PinType::Integer).output("R", PinType::Boolean),
                |_, _| Value::Bool(true),
            ))
            .with_function(ScriptFunction::new(
                comparator("Diff", PinType::Integer, PinType::Integer),
                |a, b| Value::from(int(a) - int(b)),
            ))
            .with_function(ScriptFunction::new(
                comparator("RealGreater", PinType::Real, PinType::Boolean),
                |_, _| Value::Bool(true),
            ));

        assert_eq!(
            sort_by_function(&mut array, None, "Greater"),
            Err(SortError::MissingOwner("Greater".to_string()))
        );
        assert!(matches!(
            sort_by_function(&mut array, Some(&mut owner), "Missing"),
            Err(SortError::UnknownFunction { owner, .. }) if owner == "Sorter"
        ));
        assert!(matches!(
            sort_by_function(&mut array, Some(&mut owner), "Unary"),
            Err(SortError::ArityMismatch { inputs: 1, outputs: 1, .. })
        ));
        assert!(matches!(
            sort_by_function(&mut array, Some(&mut owner), "Diff"),
            Err(SortError::ReturnNotBoolean { actual: PinType::Integer, .. })
        ));
        assert!(matches!(
            sort_by_function(&mut array, Some(&mut owner), "RealGreater"),
            Err(SortError::ParameterMismatch { expected: PinType::Integer, actual: PinType::Real, .. })
        ));
        assert_eq!(read_ints(&array), vec![2, 3, 1]);
    }

    #[test]
    fn test_non_bool_result_keeps_order() {
        let registry = DescriptorRegistry::new();
        let mut array = ints(&registry, &[3, 2, 1]);
        let mut owner = ScriptObject::new("Sorter").with_function(ScriptFunction::new(
            comparator("Broken", PinType::Any, PinType::Boolean),
            |_, _| Value::Null,
        ));

        sort_by_function(&mut array, Some(&mut owner), "Broken").unwrap();
        assert_eq!(read_ints(&array), vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_struct_array_by_field() {
        let registry = DescriptorRegistry::new();
        let entry = registry
            .register_struct(
                &TypeDef::new("game/Entry", "Entry")
                    .add_field(FieldDef::new("Name", PinType::String))
                    .add_field(FieldDef::new("Score", PinType::Integer)),
            )
            .unwrap();

        let mut array = ScriptArray::new(registry.get("game/Entry").unwrap());
        for (name, score) in [("ann", 20), ("bob", 50), ("cid", 10)] {
            array
                .push_value(&Value::from(serde_json::json!({ "Name": name, "Score": score })))
                .unwrap();
        }

        let reader = Arc::clone(&entry);
        let mut owner = ScriptObject::new("Board").with_function(ScriptFunction::new(
            comparator("LowerScore", PinType::structure("game/Entry"), PinType::Boolean),
            move |a, b| {
                let score = |bytes: &[u8]| reader.field_value(bytes, "Score").and_then(|v| v.as_i64());
                Value::Bool(score(a) < score(b))
            },
        ));

        sort_by_function(&mut array, Some(&mut owner), "LowerScore").unwrap();
        let names: Vec<Value> = array
            .values()
            .iter()
            .filter_map(|v| v.get("Name").cloned())
            .collect();
        assert_eq!(names, vec![Value::from("bob"), Value::from("ann"), Value::from("cid")]);
        assert_eq!(entry.live_strings(), 3);
    }
}
