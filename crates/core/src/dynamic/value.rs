//! Dynamic value types
//!
//! ## Equality
//!
//! Different tags are NEVER equal, even when they hold the "same" number:
//! `Integer(1) != Long(1)`. Float equality follows IEEE-754 (`NaN != NaN`).
//!
//! ## Stringification
//!
//! `Display` is the stable string form used for exact-term matching and
//! diagnostics. It must not change: index documents are compared by it.

use crate::error::{Error, Result};
use crate::ids::Nid;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Closed enumeration of dynamic column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DynamicDataType {
    /// UTF-8 text
    String,
    /// true / false
    Boolean,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Portable identifier
    Uuid,
    /// Component handle
    Nid,
    /// Opaque bytes, never indexed
    ByteArray,
    /// Homogeneous array of values
    Array,
    /// Schema-only: the column accepts any concrete type
    Polymorphic,
}

impl DynamicDataType {
    /// Get the type name as a string
    pub fn name(&self) -> &'static str {
        match self {
            DynamicDataType::String => "String",
            DynamicDataType::Boolean => "Boolean",
            DynamicDataType::Integer => "Integer",
            DynamicDataType::Long => "Long",
            DynamicDataType::Float => "Float",
            DynamicDataType::Double => "Double",
            DynamicDataType::Uuid => "UUID",
            DynamicDataType::Nid => "Nid",
            DynamicDataType::ByteArray => "ByteArray",
            DynamicDataType::Array => "Array",
            DynamicDataType::Polymorphic => "Polymorphic",
        }
    }

    /// Integer, Long, Float or Double
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DynamicDataType::Integer
                | DynamicDataType::Long
                | DynamicDataType::Float
                | DynamicDataType::Double
        )
    }

    /// True if a column of this type accepts a value of type `actual`
    pub fn accepts(&self, actual: DynamicDataType) -> bool {
        *self == DynamicDataType::Polymorphic || *self == actual
    }
}

impl fmt::Display for DynamicDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// DynamicArray
// ============================================================================

/// Homogeneous array of dynamic values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicArray {
    element_type: DynamicDataType,
    elements: Vec<DynamicValue>,
}

impl DynamicArray {
    /// Create an array, checking every element against `element_type`
    ///
    /// # Errors
    ///
    /// `InvalidValue` if `element_type` is `Polymorphic`,
    /// `HeterogeneousArray` if an element has another type.
    pub fn new(element_type: DynamicDataType, elements: Vec<DynamicValue>) -> Result<Self> {
        if element_type == DynamicDataType::Polymorphic {
            return Err(Error::InvalidValue(
                "arrays must declare a concrete element type".to_string(),
            ));
        }
        if let Some(bad) = elements.iter().find(|e| e.data_type() != element_type) {
            return Err(Error::HeterogeneousArray {
                expected: element_type,
                actual: bad.data_type(),
            });
        }
        Ok(DynamicArray {
            element_type,
            elements,
        })
    }

    /// Declared element type
    pub fn element_type(&self) -> DynamicDataType {
        self.element_type
    }

    /// Elements in order
    pub fn elements(&self) -> &[DynamicValue] {
        &self.elements
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if there are no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

// ============================================================================
// DynamicValue
// ============================================================================

/// Concrete dynamic value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DynamicValue {
    /// UTF-8 text
    String(String),
    /// true / false
    Boolean(bool),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Portable identifier
    Uuid(Uuid),
    /// Component handle
    Nid(Nid),
    /// Opaque bytes
    ByteArray(Vec<u8>),
    /// Homogeneous array
    Array(DynamicArray),
}

impl PartialEq for DynamicValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DynamicValue::String(a), DynamicValue::String(b)) => a == b,
            (DynamicValue::Boolean(a), DynamicValue::Boolean(b)) => a == b,
            (DynamicValue::Integer(a), DynamicValue::Integer(b)) => a == b,
            (DynamicValue::Long(a), DynamicValue::Long(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (DynamicValue::Float(a), DynamicValue::Float(b)) => a == b,
            (DynamicValue::Double(a), DynamicValue::Double(b)) => a == b,
            (DynamicValue::Uuid(a), DynamicValue::Uuid(b)) => a == b,
            (DynamicValue::Nid(a), DynamicValue::Nid(b)) => a == b,
            (DynamicValue::ByteArray(a), DynamicValue::ByteArray(b)) => a == b,
            (DynamicValue::Array(a), DynamicValue::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl DynamicValue {
    /// Tag of this value
    pub fn data_type(&self) -> DynamicDataType {
        match self {
            DynamicValue::String(_) => DynamicDataType::String,
            DynamicValue::Boolean(_) => DynamicDataType::Boolean,
            DynamicValue::Integer(_) => DynamicDataType::Integer,
            DynamicValue::Long(_) => DynamicDataType::Long,
            DynamicValue::Float(_) => DynamicDataType::Float,
            DynamicValue::Double(_) => DynamicDataType::Double,
            DynamicValue::Uuid(_) => DynamicDataType::Uuid,
            DynamicValue::Nid(_) => DynamicDataType::Nid,
            DynamicValue::ByteArray(_) => DynamicDataType::ByteArray,
            DynamicValue::Array(_) => DynamicDataType::Array,
        }
    }

    /// Convenience constructor for string values
    pub fn string(s: impl Into<String>) -> Self {
        DynamicValue::String(s.into())
    }

    /// Numeric view as f64, for validators
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynamicValue::Integer(v) => Some(*v as f64),
            DynamicValue::Long(v) => Some(*v as f64),
            DynamicValue::Float(v) => Some(*v as f64),
            DynamicValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Leaf values, with arrays flattened recursively
    ///
    /// A scalar yields itself; an array yields its elements' leaves in order.
    pub fn flatten(&self) -> Vec<&DynamicValue> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(value) = stack.pop() {
            match value {
                DynamicValue::Array(array) => {
                    // Reverse so the leftmost element is processed first
                    stack.extend(array.elements().iter().rev());
                }
                leaf => out.push(leaf),
            }
        }
        out
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::String(s) => f.write_str(s),
            DynamicValue::Boolean(b) => write!(f, "{}", b),
            DynamicValue::Integer(v) => write!(f, "{}", v),
            DynamicValue::Long(v) => write!(f, "{}", v),
            DynamicValue::Float(v) => write!(f, "{}", v),
            DynamicValue::Double(v) => write!(f, "{}", v),
            DynamicValue::Uuid(u) => write!(f, "{}", u.hyphenated()),
            DynamicValue::Nid(n) => write!(f, "{}", n),
            DynamicValue::ByteArray(bytes) => write!(f, "[{} bytes]", bytes.len()),
            DynamicValue::Array(array) => {
                f.write_str("[")?;
                for (i, element) in array.elements().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::String(s)
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        DynamicValue::Boolean(b)
    }
}

impl From<i32> for DynamicValue {
    fn from(v: i32) -> Self {
        DynamicValue::Integer(v)
    }
}

impl From<i64> for DynamicValue {
    fn from(v: i64) -> Self {
        DynamicValue::Long(v)
    }
}

impl From<f32> for DynamicValue {
    fn from(v: f32) -> Self {
        DynamicValue::Float(v)
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        DynamicValue::Double(v)
    }
}

impl From<Uuid> for DynamicValue {
    fn from(u: Uuid) -> Self {
        DynamicValue::Uuid(u)
    }
}

impl From<Nid> for DynamicValue {
    fn from(n: Nid) -> Self {
        DynamicValue::Nid(n)
    }
}
