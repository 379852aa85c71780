//! Field naming shared by the indexers and the query builder
//!
//! Index-time and query-time encodings must agree exactly, so every field
//! name is produced here and nowhere else.

/// Unqualified data field, written for every indexed column
pub const COL_DATA: &str = "colData";

/// Suffix of the whitespace-analyzed twin of a text field
pub const WHITESPACE_SUFFIX: &str = "_ws";

/// Exact-term field binding a document to its assemblage
pub const ASSEMBLAGE: &str = "_assemblage_";

/// Doc value and stored field holding the owning component's nid
pub const COMPONENT_NID: &str = "_component_nid_";

/// Description text
pub const DESCRIPTION_TEXT: &str = "description";

/// Exact-term field holding the description type concept
pub const DESCRIPTION_TYPE: &str = "descriptionType";

/// Exact-term field holding the language concept
pub const DESCRIPTION_LANGUAGE: &str = "language";

/// Column-qualified data field
///
/// ```
/// use termstore_search::fields;
///
/// assert_eq!(fields::column(2), "colData_2");
/// assert_eq!(fields::whitespace(&fields::column(2)), "colData_2_ws");
/// ```
pub fn column(index: usize) -> String {
    format!("{}_{}", COL_DATA, index)
}

/// Data field for an optional column, unqualified when `None`
pub fn data(column_index: Option<usize>) -> String {
    match column_index {
        Some(index) => column(index),
        None => COL_DATA.to_string(),
    }
}

/// Whitespace-analyzed twin of a text field
pub fn whitespace(field: &str) -> String {
    format!("{}{}", field, WHITESPACE_SUFFIX)
}
