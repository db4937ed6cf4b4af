//! SQL builder for the SQLite datastore: quoted identifiers, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
