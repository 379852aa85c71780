//! Query model and query-string parsing
//!
//! Queries compose the primitives every full-text engine offers: exact
//! terms, term prefixes, typed numeric ranges and boolean combination.
//!
//! ## Query strings
//!
//! `parse_text` splits on whitespace. A word starting with an unescaped `-`
//! is negated; `\` escapes the next character. `escape_query_text` makes
//! arbitrary text safe by escaping a leading `-` and every `-` that follows
//! whitespace, so nid-looking (`-2147483647`) and UUID-looking text is never
//! read as an operator.

use crate::analyzer::Analyzer;
use crate::document::{NumericKind, NumericValue};
use std::ops::Bound;
use termstore_core::{Error, Result};

/// A typed numeric range over one field
#[derive(Debug, Clone, PartialEq)]
pub struct NumericRange {
    field: String,
    kind: NumericKind,
    lower: Bound<NumericValue>,
    upper: Bound<NumericValue>,
}

impl NumericRange {
    /// Create a range; both bounds must have the range's kind
    ///
    /// # Errors
    ///
    /// `InvalidQuery` if a bound's kind differs from `kind` or a bound is NaN.
    pub fn new(
        field: impl Into<String>,
        kind: NumericKind,
        lower: Bound<NumericValue>,
        upper: Bound<NumericValue>,
    ) -> Result<Self> {
        for bound in [&lower, &upper] {
            if let Bound::Included(v) | Bound::Excluded(v) = bound {
                if v.kind() != kind {
                    return Err(Error::InvalidQuery(format!(
                        "{} bound in a {} range",
                        v.kind(),
                        kind
                    )));
                }
                let nan = match v {
                    NumericValue::Float(f) => f.is_nan(),
                    NumericValue::Double(d) => d.is_nan(),
                    _ => false,
                };
                if nan {
                    return Err(Error::InvalidQuery("NaN range bound".into()));
                }
            }
        }
        Ok(NumericRange {
            field: field.into(),
            kind,
            lower,
            upper,
        })
    }

    /// Field name
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Point representation searched
    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    /// Bounds encoded with `NumericValue::sortable`, or `None` if empty
    pub fn sortable_bounds(&self) -> Option<(Bound<i64>, Bound<i64>)> {
        let map = |b: &Bound<NumericValue>| match b {
            Bound::Included(v) => Bound::Included(v.sortable()),
            Bound::Excluded(v) => Bound::Excluded(v.sortable()),
            Bound::Unbounded => Bound::Unbounded,
        };
        let lower = map(&self.lower);
        let upper = map(&self.upper);
        let empty = match (lower, upper) {
            (Bound::Included(l), Bound::Included(u)) => l > u,
            (Bound::Included(l), Bound::Excluded(u))
            | (Bound::Excluded(l), Bound::Included(u))
            | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
            _ => false,
        };
        if empty {
            None
        } else {
            Some((lower, upper))
        }
    }
}

/// Boolean composition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    /// Every clause must match
    pub must: Vec<Query>,
    /// At least one must match when `must` is empty; otherwise only boosts
    pub should: Vec<Query>,
    /// No clause may match
    pub must_not: Vec<Query>,
}

/// A query against one index
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Documents whose field contains the exact term
    Term {
        /// Field name
        field: String,
        /// Analyzed term
        term: String,
    },
    /// Documents whose field contains a term starting with the prefix
    Prefix {
        /// Field name
        field: String,
        /// Analyzed prefix
        prefix: String,
    },
    /// Numeric range over typed points
    Range(NumericRange),
    /// Boolean composition
    Bool(BoolQuery),
    /// Every live document
    MatchAll,
}

impl Query {
    /// Exact term
    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        Query::Term {
            field: field.into(),
            term: term.into(),
        }
    }

    /// Disjunction of clauses
    pub fn any(clauses: Vec<Query>) -> Self {
        Query::Bool(BoolQuery {
            should: clauses,
            ..Default::default()
        })
    }

    /// Conjunction of clauses
    pub fn all(clauses: Vec<Query>) -> Self {
        Query::Bool(BoolQuery {
            must: clauses,
            ..Default::default()
        })
    }
}

/// Escape `-` where the parser would read it as negation
///
/// ```
/// use termstore_search::escape_query_text;
///
/// assert_eq!(escape_query_text("-42 a-b c -d"), "\\-42 a-b c \\-d");
/// ```
pub fn escape_query_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    let mut after_space = true;
    for c in text.chars() {
        if c == '-' && after_space {
            out.push('\\');
        }
        out.push(c);
        after_space = c.is_whitespace();
    }
    out
}

/// One whitespace-delimited word of a query string
struct Word {
    text: String,
    negated: bool,
}

fn split_words(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut negated = false;
    let mut at_start = true;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                at_start = false;
            }
            '-' if at_start => {
                negated = true;
                at_start = false;
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(Word {
                        text: std::mem::take(&mut current),
                        negated,
                    });
                }
                negated = false;
                at_start = true;
            }
            c => {
                current.push(c);
                at_start = false;
            }
        }
    }
    if !current.is_empty() {
        words.push(Word {
            text: current,
            negated,
        });
    }
    words
}

/// Parse a query string against one field
///
/// Every non-negated word must match. With `prefix`, the last term produced
/// by each word is matched as a prefix.
///
/// # Errors
///
/// `InvalidQuery` if the text produces no terms.
pub fn parse_text(field: &str, text: &str, analyzer: Analyzer, prefix: bool) -> Result<Query> {
    let mut query = BoolQuery::default();
    for word in split_words(text) {
        let terms = analyzer.query_terms(&word.text);
        let count = terms.len();
        let mut clauses: Vec<Query> = terms
            .into_iter()
            .enumerate()
            .map(|(i, term)| {
                if prefix && i + 1 == count {
                    Query::Prefix {
                        field: field.to_string(),
                        prefix: term,
                    }
                } else {
                    Query::term(field, term)
                }
            })
            .collect();
        let clause = match clauses.len() {
            0 => continue,
            1 => clauses.remove(0),
            _ => Query::all(clauses),
        };
        if word.negated {
            query.must_not.push(clause);
        } else {
            query.must.push(clause);
        }
    }
    if query.must.is_empty() && query.must_not.is_empty() {
        return Err(Error::InvalidQuery(format!("no searchable terms in {:?}", text)));
    }
    Ok(Query::Bool(query))
}
