//! Environment and variable domain types

mod variable;

pub use variable::{Environment, VariableMap, VariableScope};
