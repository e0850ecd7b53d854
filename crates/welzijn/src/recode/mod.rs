//! Variable recoding: raw survey codes to typed, labeled values.

mod recoder;
mod value;

pub use recoder::{RecodeDiagnostics, Recoder, VariableDiagnostics};
pub use value::{ColumnOrigin, MissingReason, TypedColumn, TypedRecord, TypedTable, TypedValue};
