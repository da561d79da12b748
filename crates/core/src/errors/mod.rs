//! Error types and result extensions for connector operations

mod builders;
mod extensions;
mod types;
mod validation;

pub use extensions::*;
pub use types::{Error, Result, SharedSource};
pub use validation::Validate;
