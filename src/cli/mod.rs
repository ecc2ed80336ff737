//! CLI command handlers

pub mod commands;

pub use commands::{build, delete_file, dump, extract, failure_hint, populate, sheets};
