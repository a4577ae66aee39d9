// Blueprint Types - Pin types and function signatures
//
// These types describe what flows through script pins and how script
// functions declare their parameters. Comparator callbacks are validated
// against these signatures before a sort runs.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Pin Types
// ─────────────────────────────────────────────────────────────────────────────

/// Data types that can flow through pins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum PinType {
    /// 32-bit floating point
    Real,
    /// 32-bit signed integer
    Integer,
    /// Boolean value
    Boolean,
    /// String value
    String,
    /// Array of a specific type
    Array { element: Box<PinType> },
    /// User-defined struct type
    Struct { struct_id: String },
    /// Wildcard - accepts anything
    Any,
}

impl PinType {
    /// Get the struct ID if this is a user-defined struct
    pub fn struct_id(&self) -> Option<&str> {
        match self {
            PinType::Struct { struct_id } => Some(struct_id),
            _ => None,
        }
    }

    /// Create a new Struct pin type
    pub fn structure(struct_id: impl Into<String>) -> Self {
        PinType::Struct {
            struct_id: struct_id.into(),
        }
    }

    /// Create a new Array pin type
    pub fn array(element: PinType) -> Self {
        PinType::Array {
            element: Box::new(element),
        }
    }
}

impl std::fmt::Display for PinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinType::Real => write!(f, "real"),
            PinType::Integer => write!(f, "integer"),
            PinType::Boolean => write!(f, "boolean"),
            PinType::String => write!(f, "string"),
            PinType::Array { element } => write!(f, "array<{}>", element),
            PinType::Struct { struct_id } => write!(f, "struct<{}>", struct_id),
            PinType::Any => write!(f, "any"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Function Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// A parameter for a function (input or output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParam {
    /// Parameter name
    pub name: String,
    /// Parameter type
    #[serde(rename = "type")]
    pub param_type: PinType,
}

impl FunctionParam {
    /// Create a parameter
    pub fn new(name: impl Into<String>, param_type: PinType) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

/// The signature of a script function callable from native code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Function name (lookup key on the owning object)
    pub name: String,
    /// Input parameters
    #[serde(default)]
    pub inputs: Vec<FunctionParam>,
    /// Output values
    #[serde(default)]
    pub outputs: Vec<FunctionParam>,
}

impl FunctionDef {
    /// Create a function with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add an input parameter
    pub fn input(mut self, name: impl Into<String>, param_type: PinType) -> Self {
        self.inputs.push(FunctionParam::new(name, param_type));
        self
    }

    /// Add an output parameter
    pub fn output(mut self, name: impl Into<String>, param_type: PinType) -> Self {
        self.outputs.push(FunctionParam::new(name, param_type));
        self
    }

    /// Total number of parameters, inputs and outputs together
    pub fn param_count(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    /// The type of the single return value, if the function has exactly one output
    pub fn return_type(&self) -> Option<&PinType> {
        match self.outputs.as_slice() {
            [only] => Some(&only.param_type),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_type_helpers() {
        let score = PinType::structure("game/Score");
        assert_eq!(score.struct_id(), Some("game/Score"));
        assert_eq!(PinType::Integer.struct_id(), None);
        assert_eq!(score.to_string(), "struct<game/Score>");
        assert_eq!(PinType::array(PinType::Real).to_string(), "array<real>");
    }

    #[test]
    fn test_function_signature() {
        let def = FunctionDef::new("SortByScore")
            .input("A", PinType::structure("Score"))
            .input("B", PinType::structure("Score"))
            .output("Swap", PinType::Boolean);

        assert_eq!(def.param_count(), 3);
        assert_eq!(def.return_type(), Some(&PinType::Boolean));
        assert_eq!(def.clone().output("Extra", PinType::Boolean).return_type(), None);
    }

    #[test]
    fn test_function_def_json() {
        let json = r#"{
            "name": "Compare",
            "inputs": [
                {"name": "A", "type": {"type": "Integer"}},
                {"name": "B", "type": {"type": "Integer"}}
            ],
            "outputs": [{"name": "Result", "type": {"type": "Boolean"}}]
        }"#;

        let def: FunctionDef = serde_json::from_str(json).unwrap();
        assert_eq!(def.inputs.len(), 2);
        assert_eq!(def.return_type(), Some(&PinType::Boolean));
        assert_eq!(def.inputs[1].param_type, PinType::Integer);
    }
}
