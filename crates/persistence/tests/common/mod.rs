//! Test infrastructure for the sync engine.
//!
//! Provides in-memory doubles for the relational store and the search index,
//! plus record fixtures and service constructors.

#![allow(dead_code)]

pub mod fixtures;
pub mod memory;

pub use fixtures::*;
pub use memory::*;
