//! Struct Helper - Type-erased struct values for the visual scripting system
//!
//! Script variables can hold a struct whose type is only known at runtime.
//! This crate stores such values behind a [`TypeDescriptor`], the capability
//! handle that knows how to construct, copy, compare, serialize and destroy
//! one instance, and supplies the helpers that operate on them:
//!
//! - [`StructContainer`] - holds at most one instance of a runtime-chosen type
//! - [`DescriptorRegistry`] - compiles user-defined struct definitions into descriptors
//! - [`Archive`] - bidirectional binary serialization
//! - [`exchange_sort`] / [`sort_by_function`] - sort script arrays with a script comparator

mod archive;
mod array;
mod container;
mod descriptor;
mod friendly_name;
mod record;
mod registry;
mod scalar;
mod sort;
mod storage;

pub use archive::*;
pub use array::*;
pub use container::*;
pub use descriptor::*;
pub use friendly_name::*;
pub use record::StructDescriptor;
pub use registry::*;
pub use scalar::*;
pub use sort::*;
pub use storage::*;

pub use blueprint_types;
