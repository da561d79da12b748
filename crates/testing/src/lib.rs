//! Test support for the mage tenant connector
//!
//! [`MemoryDriver`] implements the driver contracts from `mage-core` on top
//! of process memory and counts every cluster build, session connect and
//! close, so tests can assert how often the caches reached the driver.
//! [`Topology`] describes seed data and loads it into a driver.

pub mod driver;
pub mod topology;

pub use driver::{DriverCounters, MemoryDriver, Statement, StatementKind};
pub use topology::Topology;
