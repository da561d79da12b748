//! Core domain types for the tenant connector.
//!
//! - **`newtypes`**: validated names used as cache keys
//! - **`consistency`**: consistency levels and mapper options
//! - **`tenant`**: tenant routing records

pub mod consistency;
pub mod newtypes;
pub mod tenant;

pub use consistency::*;
pub use newtypes::*;
pub use tenant::*;
