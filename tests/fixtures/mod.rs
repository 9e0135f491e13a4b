//! Test fixtures for delivery-planner.
//!
//! Provides realistic test data:
//! - Real Curitiba restaurants and delivery addresses
//! - An in-memory fact store with call counters and a failure switch

#![allow(dead_code)]

pub mod curitiba_locations;
pub mod memory_store;

pub use curitiba_locations::*;
pub use memory_store::MemoryStore;
