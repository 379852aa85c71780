//! Assemblage column schemas
//!
//! A dynamic assemblage declares an ordered list of columns. Every dynamic
//! version written against the assemblage must supply exactly one slot per
//! column; a slot is either a value whose tag the column accepts, or empty
//! when the column is optional.

use super::value::{DynamicDataType, DynamicValue};
use crate::error::{Error, Result};
use crate::ids::Nid;
use serde::{Deserialize, Serialize};

/// Numeric range check applied to a column's values on write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValidator {
    /// value < bound
    LessThan(f64),
    /// value <= bound
    LessThanOrEqual(f64),
    /// value > bound
    GreaterThan(f64),
    /// value >= bound
    GreaterThanOrEqual(f64),
    /// value within [low, high], each end inclusive or exclusive
    Interval {
        /// Lower bound
        low: f64,
        /// Whether `low` itself is allowed
        low_inclusive: bool,
        /// Upper bound
        high: f64,
        /// Whether `high` itself is allowed
        high_inclusive: bool,
    },
}

impl ColumnValidator {
    fn check(&self, value: &DynamicValue) -> std::result::Result<(), String> {
        let x = value
            .as_f64()
            .ok_or_else(|| format!("{} is not numeric", value.data_type()))?;
        let ok = match *self {
            ColumnValidator::LessThan(b) => x < b,
            ColumnValidator::LessThanOrEqual(b) => x <= b,
            ColumnValidator::GreaterThan(b) => x > b,
            ColumnValidator::GreaterThanOrEqual(b) => x >= b,
            ColumnValidator::Interval {
                low,
                low_inclusive,
                high,
                high_inclusive,
            } => {
                let above = if low_inclusive { x >= low } else { x > low };
                let below = if high_inclusive { x <= high } else { x < high };
                above && below
            }
        };
        if ok {
            Ok(())
        } else {
            Err(format!("{} fails {:?}", x, self))
        }
    }
}

/// One column of a dynamic assemblage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Position in the data vector
    pub index: usize,
    /// Concept naming the column
    pub name: Nid,
    /// Declared type (`Polymorphic` accepts any concrete value)
    pub data_type: DynamicDataType,
    /// Value used when the slot is empty
    pub default: Option<DynamicValue>,
    /// Whether the slot may be empty (after defaulting)
    pub required: bool,
    /// Checks applied to every leaf value in the slot
    pub validators: Vec<ColumnValidator>,
}

impl ColumnDescriptor {
    /// Optional column with no default and no validators
    pub fn new(index: usize, name: Nid, data_type: DynamicDataType) -> Self {
        ColumnDescriptor {
            index,
            name,
            data_type,
            default: None,
            required: false,
            validators: Vec::new(),
        }
    }

    /// Builder: mark the column required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder: set the default value
    pub fn with_default(mut self, value: DynamicValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Builder: add a validator
    pub fn with_validator(mut self, validator: ColumnValidator) -> Self {
        self.validators.push(validator);
        self
    }

    fn check_value(&self, value: &DynamicValue) -> Result<()> {
        if !self.data_type.accepts(value.data_type()) {
            return Err(Error::ColumnTypeMismatch {
                column: self.index,
                expected: self.data_type,
                actual: value.data_type(),
            });
        }
        for validator in &self.validators {
            for leaf in value.flatten() {
                validator
                    .check(leaf)
                    .map_err(|reason| Error::ValidatorRejected {
                        column: self.index,
                        reason,
                    })?;
            }
        }
        Ok(())
    }
}

/// Ordered column list of a dynamic assemblage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicSchema {
    assemblage: Nid,
    columns: Vec<ColumnDescriptor>,
}

impl DynamicSchema {
    /// Create a schema
    ///
    /// # Errors
    ///
    /// `InvalidValue` if column indices are not `0..n` in order, or a default
    /// does not satisfy its own column.
    pub fn new(assemblage: Nid, columns: Vec<ColumnDescriptor>) -> Result<Self> {
        for (position, column) in columns.iter().enumerate() {
            if column.index != position {
                return Err(Error::InvalidValue(format!(
                    "column at position {} declares index {}",
                    position, column.index
                )));
            }
            if let Some(default) = &column.default {
                column.check_value(default)?;
            }
        }
        Ok(DynamicSchema {
            assemblage,
            columns,
        })
    }

    /// Assemblage this schema belongs to
    pub fn assemblage(&self) -> Nid {
        self.assemblage
    }

    /// Columns in order
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True for a zero-column (marker) assemblage
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check a data vector against the schema and fill in defaults
    ///
    /// # Errors
    ///
    /// `ArityMismatch` when the vector length differs from the column count;
    /// `ColumnTypeMismatch`, `MissingRequiredColumn` or `ValidatorRejected`
    /// for the first offending slot.
    pub fn complete(&self, data: Vec<Option<DynamicValue>>) -> Result<Vec<Option<DynamicValue>>> {
        if data.len() != self.columns.len() {
            return Err(Error::ArityMismatch {
                assemblage: self.assemblage,
                expected: self.columns.len(),
                actual: data.len(),
            });
        }
        let mut completed = Vec::with_capacity(data.len());
        for (column, slot) in self.columns.iter().zip(data) {
            let slot = slot.or_else(|| column.default.clone());
            match &slot {
                Some(value) => column.check_value(value)?,
                None if column.required => {
                    return Err(Error::MissingRequiredColumn {
                        column: column.index,
                    })
                }
                None => {}
            }
            completed.push(slot);
        }
        Ok(completed)
    }
}
