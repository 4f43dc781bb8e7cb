pub mod document;
pub mod validation;

pub use document::{
    parse_document_file, parse_document_str, parse_document_value, ScenarioDocument,
};
pub use validation::{validate_document, ShellBounds, ValidatedImport};
