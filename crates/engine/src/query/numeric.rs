//! Numeric range probes
//!
//! A stored number lives in exactly one point representation (Int, Long,
//! Float or Double) and ranges only match points of their own kind. A query
//! range is therefore expanded into one probe per representation, each with
//! bounds converted so that the probe matches exactly the stored values of
//! that kind lying inside the original range.
//!
//! Conversion is directed: a lower bound that falls between two representable
//! values of the target kind moves up to the next one, an upper bound moves
//! down. A probe whose range is empty for its kind is dropped.

use std::cmp::Ordering;
use std::ops::Bound;
use termstore_core::{DynamicValue, Error, Result};
use termstore_search::{NumericKind, NumericRange, NumericValue, Query};

/// A bound value with its exact source precision
#[derive(Debug, Clone, Copy)]
enum Number {
    Integral(i64),
    Real(f64),
}

fn number(value: &DynamicValue) -> Result<Number> {
    let number = match value {
        DynamicValue::Integer(v) => Number::Integral(*v as i64),
        DynamicValue::Long(v) => Number::Integral(*v),
        DynamicValue::Float(v) => Number::Real(*v as f64),
        DynamicValue::Double(v) => Number::Real(*v),
        other => return Err(Error::NonNumericRange(other.data_type())),
    };
    if let Number::Real(x) = number {
        if x.is_nan() {
            return Err(Error::InvalidQuery("NaN range bound".into()));
        }
    }
    Ok(number)
}

fn convert(bound: Bound<&DynamicValue>) -> Result<Bound<Number>> {
    Ok(match bound {
        Bound::Included(v) => Bound::Included(number(v)?),
        Bound::Excluded(v) => Bound::Excluded(number(v)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

/// Which end of the range a bound sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

/// Smallest (lower) or largest (upper) integer the bound admits
fn integer_candidate(bound: Bound<Number>, side: Side) -> Option<i128> {
    Some(match (bound, side) {
        (Bound::Unbounded, _) => return None,
        (Bound::Included(Number::Integral(v)), _) => v as i128,
        (Bound::Excluded(Number::Integral(v)), Side::Lower) => v as i128 + 1,
        (Bound::Excluded(Number::Integral(v)), Side::Upper) => v as i128 - 1,
        (Bound::Included(Number::Real(x)), Side::Lower) => x.ceil() as i128,
        (Bound::Included(Number::Real(x)), Side::Upper) => x.floor() as i128,
        (Bound::Excluded(Number::Real(x)), Side::Lower) => (x.floor() as i128).saturating_add(1),
        (Bound::Excluded(Number::Real(x)), Side::Upper) => (x.ceil() as i128).saturating_sub(1),
    })
}

/// Bound for an integer kind spanning `[min, max]`
///
/// `None` means no value of the kind can satisfy the bound.
fn integer_bound(bound: Bound<Number>, side: Side, min: i64, max: i64) -> Option<Bound<i64>> {
    let Some(n) = integer_candidate(bound, side) else {
        return Some(Bound::Unbounded);
    };
    let (min, max) = (min as i128, max as i128);
    match side {
        Side::Lower if n > max => None,
        Side::Lower if n <= min => Some(Bound::Unbounded),
        Side::Upper if n < min => None,
        Side::Upper if n >= max => Some(Bound::Unbounded),
        _ => Some(Bound::Included(n as i64)),
    }
}

/// Exact comparison of a rounded value with the bound it came from
fn compare(rounded: f64, source: Number) -> Ordering {
    match source {
        Number::Real(x) => rounded.partial_cmp(&x).unwrap_or(Ordering::Equal),
        // rounded is integral and within i64 range
        Number::Integral(v) => (rounded as i128).cmp(&(v as i128)),
    }
}

/// Bound for a floating kind; `round` maps a number to its nearest value
fn float_bound(bound: Bound<Number>, side: Side, round: fn(Number) -> f64) -> Bound<f64> {
    let (value, inclusive) = match bound {
        Bound::Unbounded => return Bound::Unbounded,
        Bound::Included(v) => (v, true),
        Bound::Excluded(v) => (v, false),
    };
    let rounded = round(value);
    match (compare(rounded, value), side) {
        (Ordering::Equal, _) if inclusive => Bound::Included(rounded),
        (Ordering::Equal, _) => Bound::Excluded(rounded),
        (Ordering::Greater, Side::Lower) | (Ordering::Less, Side::Upper) => Bound::Included(rounded),
        (Ordering::Less, Side::Lower) | (Ordering::Greater, Side::Upper) => Bound::Excluded(rounded),
    }
}

fn to_float(n: Number) -> f64 {
    match n {
        Number::Integral(v) => v as f32 as f64,
        Number::Real(x) => x as f32 as f64,
    }
}

fn to_double(n: Number) -> f64 {
    match n {
        Number::Integral(v) => v as f64,
        Number::Real(x) => x,
    }
}

fn map_bound<T, U>(bound: Bound<T>, f: impl Fn(T) -> U) -> Bound<U> {
    match bound {
        Bound::Included(v) => Bound::Included(f(v)),
        Bound::Excluded(v) => Bound::Excluded(f(v)),
        Bound::Unbounded => Bound::Unbounded,
    }
}

/// Per-kind probes of a range over one field
///
/// # Errors
///
/// `NonNumericRange` if a bound is not Integer, Long, Float or Double;
/// `InvalidQuery` if a bound is NaN.
pub fn range_probes(
    field: &str,
    lower: Bound<&DynamicValue>,
    upper: Bound<&DynamicValue>,
) -> Result<Vec<NumericRange>> {
    let lower = convert(lower)?;
    let upper = convert(upper)?;
    let mut probes = Vec::with_capacity(4);

    let integral = [
        (NumericKind::Int, i32::MIN as i64, i32::MAX as i64),
        (NumericKind::Long, i64::MIN, i64::MAX),
    ];
    for (kind, min, max) in integral {
        let (Some(l), Some(u)) = (
            integer_bound(lower, Side::Lower, min, max),
            integer_bound(upper, Side::Upper, min, max),
        ) else {
            continue;
        };
        let value = |v: i64| match kind {
            NumericKind::Int => NumericValue::Int(v as i32),
            _ => NumericValue::Long(v),
        };
        probes.push(NumericRange::new(field, kind, map_bound(l, value), map_bound(u, value))?);
    }

    let floating: [(NumericKind, fn(Number) -> f64); 2] =
        [(NumericKind::Float, to_float), (NumericKind::Double, to_double)];
    for (kind, round) in floating {
        let l = float_bound(lower, Side::Lower, round);
        let u = float_bound(upper, Side::Upper, round);
        let value = |v: f64| match kind {
            NumericKind::Float => NumericValue::Float(v as f32),
            _ => NumericValue::Double(v),
        };
        probes.push(NumericRange::new(field, kind, map_bound(l, value), map_bound(u, value))?);
    }

    probes.retain(|probe| probe.sortable_bounds().is_some());
    Ok(probes)
}

/// Disjunction of the range's probes over every field
///
/// # Errors
///
/// As `range_probes`.
pub fn range_query(
    fields: &[String],
    lower: Bound<&DynamicValue>,
    upper: Bound<&DynamicValue>,
) -> Result<Query> {
    let mut clauses = Vec::new();
    for field in fields {
        clauses.extend(range_probes(field, lower, upper)?.into_iter().map(Query::Range));
    }
    Ok(Query::any(clauses))
}

/// Probes matching a single value in every representation
///
/// # Errors
///
/// As `range_probes`.
pub fn point_query(fields: &[String], value: &DynamicValue) -> Result<Query> {
    range_query(fields, Bound::Included(value), Bound::Included(value))
}
