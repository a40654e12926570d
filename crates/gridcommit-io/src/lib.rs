//! # gridcommit-io: Model-Data Files & Run-Log Export
//!
//! Reads the section-based `.dat` model-data format into a validated
//! [`ModelData`] bundle and writes accumulated run logs back out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridcommit_io::load_model_data;
//! use std::path::Path;
//!
//! fn main() -> gridcommit_core::GridResult<()> {
//!     let data = load_model_data(Path::new("model.dat"))?;
//!     data.diagnostics.log();
//!
//!     println!("Nodes: {}", data.grid.nodes().len());
//!     println!("Generators: {}", data.grid.generators().len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`dat`] - tokenizer and block parser for the `.dat` format
//! - [`model_data`] - cross-checks sets against tables and builds the grid
//! - [`export`] - JSON / CSV export of a [`SimulationLog`](gridcommit_core::SimulationLog)
//!
//! ## Error Handling
//!
//! Loading returns [`gridcommit_core::GridError`]: `Parse` for syntax
//! problems (with the offending line) and `DataIntegrity` for content that
//! contradicts the declared sets. Export uses `anyhow` with context.

pub mod dat;
pub mod export;
pub mod model_data;

pub use export::{ExportFormat, LogExport};
pub use model_data::{
    load_model_data, load_model_data_with, model_data_from_str, LoadOptions, ModelData,
};
