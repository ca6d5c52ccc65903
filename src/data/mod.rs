//! Data layer: row access, column descriptors, view state and derivation.
//!
//! Rows are never copied or mutated; a derived view refers to them by index.

// Row values and column descriptors
pub mod coercion;
pub mod column;
pub mod record;
pub mod type_inference;

// Search, filters and comparison
pub mod datavalue_compare;
pub mod filter;

// View state and derivation
pub mod data_view;
pub mod view_engine;
pub mod view_state;
