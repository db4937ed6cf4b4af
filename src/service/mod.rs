//! Request-level services that run before the datastore is touched.

mod validation;
pub use validation::{CompiledRules, RequestValidator};
