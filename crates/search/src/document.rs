//! Index documents
//!
//! A document is a keyed bag of fields. Text fields are analyzed into terms,
//! numeric fields are typed points that only range queries of the same
//! `NumericKind` can hit, doc values are per-document numbers for fast
//! lookup, and stored fields are returned verbatim.

use crate::analyzer::Analyzer;
use std::collections::BTreeMap;
use std::fmt;

/// Concrete representation of a numeric point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericKind {
    /// 32-bit integer points
    Int,
    /// 64-bit integer points
    Long,
    /// 32-bit float points
    Float,
    /// 64-bit float points
    Double,
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumericKind::Int => "int",
            NumericKind::Long => "long",
            NumericKind::Float => "float",
            NumericKind::Double => "double",
        };
        f.write_str(name)
    }
}

/// A typed numeric value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
}

impl NumericValue {
    /// Representation of the value
    pub fn kind(&self) -> NumericKind {
        match self {
            NumericValue::Int(_) => NumericKind::Int,
            NumericValue::Long(_) => NumericKind::Long,
            NumericValue::Float(_) => NumericKind::Float,
            NumericValue::Double(_) => NumericKind::Double,
        }
    }

    /// Order-preserving i64 encoding within one kind
    ///
    /// Integers map to themselves; floats use the sign-flipped IEEE bits so
    /// that `a < b` iff `sortable(a) < sortable(b)`.
    pub fn sortable(&self) -> i64 {
        match *self {
            NumericValue::Int(v) => v as i64,
            NumericValue::Long(v) => v,
            NumericValue::Float(v) => sortable_double(v as f64),
            NumericValue::Double(v) => sortable_double(v),
        }
    }
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::Int(v) => write!(f, "{}", v),
            NumericValue::Long(v) => write!(f, "{}", v),
            NumericValue::Float(v) => write!(f, "{}", v),
            NumericValue::Double(v) => write!(f, "{}", v),
        }
    }
}

fn sortable_double(v: f64) -> i64 {
    // -0.0 and 0.0 must collide
    let v = if v == 0.0 { 0.0 } else { v };
    let bits = v.to_bits() as i64;
    bits ^ ((bits >> 63) & i64::MAX)
}

/// Content of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Analyzed text
    Text {
        /// Raw text
        text: String,
        /// Analyzer producing the terms
        analyzer: Analyzer,
    },
    /// Numeric point
    Numeric(NumericValue),
}

/// One indexed field
#[derive(Debug, Clone, PartialEq)]
pub struct IndexField {
    /// Field name
    pub name: String,
    /// Field content
    pub value: FieldValue,
}

impl IndexField {
    /// Text field
    pub fn text(name: impl Into<String>, text: impl Into<String>, analyzer: Analyzer) -> Self {
        IndexField {
            name: name.into(),
            value: FieldValue::Text {
                text: text.into(),
                analyzer,
            },
        }
    }

    /// Numeric field
    pub fn numeric(name: impl Into<String>, value: NumericValue) -> Self {
        IndexField {
            name: name.into(),
            value: FieldValue::Numeric(value),
        }
    }
}

/// A document to insert or replace by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexDocument {
    /// Stable key; inserting an existing key replaces that document
    pub key: String,
    /// Indexed fields
    pub fields: Vec<IndexField>,
    /// Per-document numeric values for fast lookup
    pub doc_values: BTreeMap<String, i64>,
    /// Fields returned verbatim
    pub stored: BTreeMap<String, String>,
}

impl IndexDocument {
    /// Empty document with a key
    pub fn new(key: impl Into<String>) -> Self {
        IndexDocument {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Add an indexed field
    pub fn add(&mut self, field: IndexField) {
        self.fields.push(field);
    }

    /// Set a doc value
    pub fn set_doc_value(&mut self, name: impl Into<String>, value: i64) {
        self.doc_values.insert(name.into(), value);
    }

    /// Set a stored field
    pub fn store(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.stored.insert(name.into(), value.into());
    }
}
