//! Sheetbase - hosted spreadsheets as a small relational store
//!
//! This library compiles declarative sheet definitions into ordered mutation
//! batches, treats individual sheets as identity-indexed row tables, and
//! extracts live formulas back out into flat CSV exports.
//!
//! # Features
//!
//! - Schema compiler: definitions → `AddSheet`/`WriteHeaderRow`/`DeleteSheet` batch
//! - Row store: append, find by id, update and delete rows of one sheet
//! - Formula extraction with a template / explicit list / pattern selection policy
//! - A1 coordinate and hex color codec
//! - Google Sheets backend plus an in-memory backend for tests and dry runs
//!
//! # Example
//!
//! ```no_run
//! use sheetbase::actions;
//! use sheetbase::parser::parse_definition;
//! use sheetbase::service::MemoryService;
//! use std::path::Path;
//!
//! let definition = parse_definition(Path::new("investors.yaml"))?;
//! let mut service = MemoryService::new();
//! let outcome = actions::build(&mut service, &definition)?;
//!
//! println!("Created {} with {} ops", outcome.spreadsheet_id, outcome.ops.len());
//! # Ok::<(), sheetbase::error::SheetError>(())
//! ```

pub mod actions;
pub mod cli;
pub mod codec;
pub mod compiler;
pub mod config;
pub mod error;
pub mod extract;
pub mod parser;
pub mod rowstore;
pub mod service;
pub mod tabular;
pub mod types;

// Re-export commonly used types
pub use error::{SheetError, SheetResult};
pub use rowstore::RowStore;
pub use service::SpreadsheetService;
pub use types::{ExtractedFormula, MutationOp, SheetDefinition, SpreadsheetHandle, TableRow};
