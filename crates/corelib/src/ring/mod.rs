//! Token ring planning.
//!
//! The ring itself is owned by the storage processes; this module only decides
//! which positions new and replacement nodes should take.

pub mod generator;

pub use generator::TokenGenerator;
