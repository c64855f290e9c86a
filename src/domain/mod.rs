//! Core domain types and logic.

pub mod record;
pub mod resolution;
pub mod series;
pub mod slicer;
pub mod execution;
pub mod strategy;
pub mod error;
