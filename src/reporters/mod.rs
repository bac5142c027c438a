//! Output rendering for the mined datasets
//!
//! Supports:
//! - `text` - Terminal run summary with colors
//! - `json` - Machine-readable tables and reports
//! - `csv` - Features and changes tables for spreadsheet import
//!
//! The metric fields are controlled identifiers and numbers, so CSV
//! rendering stays a plain string writer; quoting only guards the
//! repository column.

pub mod csv;
pub mod json;
pub mod text;
