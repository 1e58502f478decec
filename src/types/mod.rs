//! Type definitions shared by the engine, cursors and collaborators.

/// Navigation paths
pub mod path;

/// A stored document: any JSON-compatible tree.
pub type Document = serde_json::Value;

pub use path::{Key, Path};

/// Get the type name of a document node, for error messages.
#[inline]
pub fn value_type_name(v: &Document) -> &'static str {
    match v {
        Document::Null => "null",
        Document::Bool(_) => "boolean",
        Document::Number(_) => "number",
        Document::String(_) => "string",
        Document::Array(_) => "array",
        Document::Object(_) => "object",
    }
}
