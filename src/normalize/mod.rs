//! Tree normalization: canonical key order and variable substitution.
//!
//! Both steps are pure functions over the configuration tree. Canonicalization
//! makes the rendered chunk text independent of attribute order in the source;
//! substitution inlines `${var.name}` references that a variables file defines.

mod canonical;
mod variables;

pub use canonical::canonicalize;
pub use variables::{resolve, VariableScopes, VariableTable};
