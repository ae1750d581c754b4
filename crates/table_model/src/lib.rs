//! Table Model - Element tree and virtual grid for span-aware tables
//!
//! This crate provides the data layer for the table editing engine: an
//! id-addressed element tree that stands in for live table markup (rows and
//! cells with tag, colspan, rowspan, scope and CSS classes), a markup
//! round-trip, and the virtual grid that resolves colspan/rowspan into a
//! rectangular logical matrix.

mod node_id;
mod element;
mod tree;
mod error;
pub mod grid;
pub mod markup;

pub use node_id::*;
pub use element::*;
pub use tree::*;
pub use error::*;
pub use grid::{Grid, GridCell, GridRow};
