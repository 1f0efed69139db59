//! Variable resolution module
//!
//! Dynamic `$` variables, the `{{reference}}` parser and the substitution
//! engine.
//!
//! # Usage
//!
//! ```
//! use vortex_application::variable_resolver::substitute;
//! use vortex_domain::VariableMap;
//!
//! let mut env = VariableMap::new();
//! env.insert("host".to_string(), "localhost".to_string());
//!
//! let result = substitute("http://{{env.host}}/{{path}}", &env, &VariableMap::new(), &VariableMap::new());
//! assert_eq!(result.text, "http://localhost/{{path}}");
//! assert_eq!(result.unresolved, vec!["{{path}}"]);
//! ```

pub mod dynamic;
pub mod engine;
pub mod parser;

pub use dynamic::{DynamicInfo, DynamicVariables};
pub use engine::{
    DEFAULT_MAX_DEPTH, Substitution, VariableResolver, VariableScopes, expand_legacy_dynamic,
    merge_unresolved, substitute, substitute_map,
};
pub use parser::{
    ReferenceKind, VariableReference, extract_variable_name, find_variables, format_variable,
    has_variables, parse_references, validate_name,
};
