//! Table Engine - selection and structural editing for span-aware tables
//!
//! This crate implements the behavior layer on top of [`table_model`]: cell
//! wrappers with an activation lifecycle, the row/column/cell selection
//! state machine (including free-form rectangle drags with colspan bleed
//! correction), the editable-table aggregate with all structural mutations
//! (insert/delete rows and columns, merge, split, header toggle), and the
//! registry tying tables to the host editor's lifecycle.

mod cell;
mod config;
mod error;
mod events;
mod picker;
mod registry;
mod selection;
mod table;

pub use cell::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use picker::*;
pub use registry::*;
pub use selection::*;
pub use table::*;
