pub mod cli;
pub mod config;
pub mod csv_codec;
pub mod error;
pub mod exchange;
pub mod tree;

pub use error::{Result, TagCsvError};
