//! Loading survey exports into memory.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig};
pub use source::{DataTable, RawRecord, RawValue, SourceMetadata};
