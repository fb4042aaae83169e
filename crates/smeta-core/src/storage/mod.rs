//! Storage module for the JSON estimate format

mod parser;
mod writer;

pub use parser::{Loaded, parse_estimate, parse_estimate_str};
pub use writer::{write_estimate, write_estimate_string};
