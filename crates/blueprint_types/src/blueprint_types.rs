//! Blueprint Types - Shared vocabulary for struct helper nodes
//!
//! This crate contains the pure data structures exchanged between the host
//! and visual scripts: pin types, function signatures, user-defined struct
//! definitions and the universal `Value`.

mod type_def;
mod types;
mod value;

pub use type_def::*;
pub use types::*;
pub use value::*;
