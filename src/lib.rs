//! Searchable, filterable, sortable and paginated views over in-memory rows.
//!
//! The [`data`] module holds the view engine. The remaining modules are the
//! host side used by the `case-table` binary: file loaders, configuration,
//! logging, rendering and the command parser.

pub mod commands;
pub mod config;
pub mod data;
pub mod loaders;
pub mod logging;
pub mod table_display;
