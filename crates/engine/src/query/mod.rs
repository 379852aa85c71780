//! Query engine
//!
//! Turns a `QueryRequest` into a backend query and resolves the hits back to
//! component nids.
//!
//! ## Field selection
//!
//! Semantic queries search `colData` unless the request restricts columns.
//! A column restriction needs exactly one assemblage; when that assemblage
//! has two or more indexed columns the per-column fields are searched,
//! otherwise the restriction is satisfied by `colData` itself.
//!
//! ## Value forms
//!
//! - `Text`: analyzed search of the tokenized field. Text that yields no
//!   tokenized terms (punctuation only) falls back to the whitespace field.
//! - `Exact`: strings are whitespace-token conjunctions on the `_ws` field;
//!   booleans, UUIDs and nids are exact terms; numbers are point probes.
//! - `Range`: numeric probes in every point representation.

mod collector;
mod numeric;

pub use collector::{collect, resolve_hit};
pub use numeric::{point_query, range_probes, range_query};

use crate::database::config::NidQueryMode;
use crate::indexer::IndexKind;
use crate::registry::SchemaRegistry;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;
use termstore_core::{DynamicDataType, DynamicValue, Error, Nid, Result};
use termstore_search::{escape_query_text, fields, parse_text, Analyzer, Query};

/// What to match
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Analyzed text; with `prefix` the last term matches as a prefix
    Text {
        /// Query text, matched literally
        text: String,
        /// Prefix match on the last term
        prefix: bool,
    },
    /// A single value
    Exact(DynamicValue),
    /// Numeric range
    Range {
        /// Lower bound
        lower: Bound<DynamicValue>,
        /// Upper bound
        upper: Bound<DynamicValue>,
    },
}

/// Caller-supplied predicate over result nids
pub type NidFilter = Arc<dyn Fn(Nid) -> bool + Send + Sync>;

/// A search against one index
#[derive(Clone)]
pub struct QueryRequest {
    /// Index searched
    pub kind: IndexKind,
    /// Value matched
    pub value: QueryValue,
    /// Only members of these assemblages; empty means any
    pub assemblages: Vec<Nid>,
    /// Only these columns; needs exactly one assemblage
    pub columns: Vec<usize>,
    /// Description index only: only these description types
    pub description_types: Vec<Nid>,
    /// Keep only nids in this set
    pub restrict_to: Option<BTreeSet<Nid>>,
    /// Keep only nids the predicate accepts
    pub filter: Option<NidFilter>,
    /// Results skipped after filtering
    pub offset: usize,
    /// Maximum results; `None` uses the configured page size
    pub limit: Option<usize>,
    /// Wait until this generation is visible before searching
    pub target_generation: Option<u64>,
}

impl QueryRequest {
    fn with_value(kind: IndexKind, value: QueryValue) -> Self {
        QueryRequest {
            kind,
            value,
            assemblages: Vec::new(),
            columns: Vec::new(),
            description_types: Vec::new(),
            restrict_to: None,
            filter: None,
            offset: 0,
            limit: None,
            target_generation: None,
        }
    }

    /// Analyzed text search of the semantic index
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_value(
            IndexKind::Semantic,
            QueryValue::Text {
                text: text.into(),
                prefix: false,
            },
        )
    }

    /// Prefix search of the semantic index
    pub fn prefix(text: impl Into<String>) -> Self {
        Self::with_value(
            IndexKind::Semantic,
            QueryValue::Text {
                text: text.into(),
                prefix: true,
            },
        )
    }

    /// Exact value search of the semantic index
    pub fn exact(value: impl Into<DynamicValue>) -> Self {
        Self::with_value(IndexKind::Semantic, QueryValue::Exact(value.into()))
    }

    /// Numeric range search of the semantic index
    pub fn range(lower: Bound<DynamicValue>, upper: Bound<DynamicValue>) -> Self {
        Self::with_value(IndexKind::Semantic, QueryValue::Range { lower, upper })
    }

    /// Analyzed text search of the description index
    pub fn descriptions(text: impl Into<String>) -> Self {
        Self::with_value(
            IndexKind::Description,
            QueryValue::Text {
                text: text.into(),
                prefix: false,
            },
        )
    }

    /// Search another index
    pub fn on(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add an assemblage to the filter
    pub fn in_assemblage(mut self, assemblage: Nid) -> Self {
        self.assemblages.push(assemblage);
        self
    }

    /// Restrict to columns of the single filtered assemblage
    pub fn columns(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Restrict descriptions to these types
    pub fn description_types(mut self, types: impl IntoIterator<Item = Nid>) -> Self {
        self.description_types.extend(types);
        self
    }

    /// Keep only nids in `nids`
    pub fn restrict_to(mut self, nids: impl IntoIterator<Item = Nid>) -> Self {
        self.restrict_to = Some(nids.into_iter().collect());
        self
    }

    /// Keep only nids `filter` accepts
    pub fn filter(mut self, filter: impl Fn(Nid) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Page of results
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Wait for `generation` before searching
    pub fn at_generation(mut self, generation: u64) -> Self {
        self.target_generation = Some(generation);
        self
    }
}

impl fmt::Debug for QueryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("assemblages", &self.assemblages)
            .field("columns", &self.columns)
            .field("description_types", &self.description_types)
            .field("restrict_to", &self.restrict_to.as_ref().map(BTreeSet::len))
            .field("filter", &self.filter.is_some())
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("target_generation", &self.target_generation)
            .finish()
    }
}

/// A resolved result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryHit {
    /// Matching component
    pub nid: Nid,
    /// Relevance score
    pub score: f32,
}

/// Translate a request into a backend query
///
/// # Errors
///
/// - `ColumnRestriction` if columns are given without exactly one assemblage
/// - `NonNumericRange` / `NotIndexable` for values that cannot be searched
/// - `InvalidQuery` for forms the target index does not support
pub fn build_query(
    request: &QueryRequest,
    registry: &SchemaRegistry,
    nid_mode: NidQueryMode,
) -> Result<Query> {
    let mut clauses = match request.kind {
        IndexKind::Semantic => vec![semantic_clause(request, registry, nid_mode)?],
        IndexKind::Description => description_clauses(request)?,
    };
    if !request.assemblages.is_empty() {
        clauses.push(Query::any(
            request
                .assemblages
                .iter()
                .map(|a| Query::term(fields::ASSEMBLAGE, a.to_string()))
                .collect(),
        ));
    }
    Ok(Query::all(clauses))
}

/// Fields a semantic request searches
fn data_fields(request: &QueryRequest, registry: &SchemaRegistry) -> Result<Vec<String>> {
    if request.columns.is_empty() {
        return Ok(vec![fields::data(None)]);
    }
    let &[assemblage] = request.assemblages.as_slice() else {
        return Err(Error::ColumnRestriction {
            assemblage_count: request.assemblages.len(),
        });
    };
    if registry.indexed_column_count(assemblage) < 2 {
        return Ok(vec![fields::data(None)]);
    }
    let columns: BTreeSet<usize> = request.columns.iter().copied().collect();
    Ok(columns.into_iter().map(|c| fields::data(Some(c))).collect())
}

fn semantic_clause(
    request: &QueryRequest,
    registry: &SchemaRegistry,
    nid_mode: NidQueryMode,
) -> Result<Query> {
    if !request.description_types.is_empty() {
        return Err(Error::InvalidQuery(
            "description types only apply to the description index".into(),
        ));
    }
    let fields = data_fields(request, registry)?;
    match &request.value {
        QueryValue::Text { text, prefix } => {
            let clauses = fields
                .iter()
                .map(|field| text_clause(field, text, *prefix))
                .collect::<Result<Vec<_>>>()?;
            Ok(Query::any(clauses))
        }
        QueryValue::Exact(value) => {
            let mut leaves = Vec::new();
            for leaf in value.flatten() {
                leaves.push(exact_clause(&fields, leaf, nid_mode)?);
            }
            if leaves.is_empty() {
                return Err(Error::InvalidQuery("empty array value".into()));
            }
            Ok(Query::all(leaves))
        }
        QueryValue::Range { lower, upper } => {
            range_query(&fields, lower.as_ref(), upper.as_ref())
        }
    }
}

fn description_clauses(request: &QueryRequest) -> Result<Vec<Query>> {
    if !request.columns.is_empty() {
        return Err(Error::InvalidQuery(
            "column restriction only applies to the semantic index".into(),
        ));
    }
    let field = fields::DESCRIPTION_TEXT;
    let value = match &request.value {
        QueryValue::Text { text, prefix } => text_clause(field, text, *prefix)?,
        QueryValue::Exact(DynamicValue::String(text)) => {
            whitespace_terms(&fields::whitespace(field), text)?
        }
        QueryValue::Exact(other) => {
            return Err(Error::InvalidQuery(format!(
                "{} values cannot match description text",
                other.data_type()
            )))
        }
        QueryValue::Range { .. } => {
            return Err(Error::InvalidQuery(
                "range queries do not apply to the description index".into(),
            ))
        }
    };
    let mut clauses = vec![value];
    if !request.description_types.is_empty() {
        clauses.push(Query::any(
            request
                .description_types
                .iter()
                .map(|t| Query::term(fields::DESCRIPTION_TYPE, t.to_string()))
                .collect(),
        ));
    }
    Ok(clauses)
}

/// Analyzed search of `field`, falling back to its whitespace twin
fn text_clause(field: &str, text: &str, prefix: bool) -> Result<Query> {
    let escaped = escape_query_text(text);
    parse_text(field, &escaped, Analyzer::Standard, prefix).or_else(|_| {
        parse_text(&fields::whitespace(field), &escaped, Analyzer::Whitespace, prefix)
    })
}

/// Every whitespace token of `text` as an exact term
fn whitespace_terms(field: &str, text: &str) -> Result<Query> {
    let terms: Vec<Query> = Analyzer::Whitespace
        .tokens(text)
        .into_iter()
        .map(|token| Query::term(field, token))
        .collect();
    if terms.is_empty() {
        return Err(Error::InvalidQuery("empty exact string".into()));
    }
    Ok(Query::all(terms))
}

fn exact_clause(names: &[String], leaf: &DynamicValue, nid_mode: NidQueryMode) -> Result<Query> {
    let ws = |field: &String| fields::whitespace(field);
    let clause = match leaf {
        DynamicValue::String(text) => Query::any(
            names
                .iter()
                .map(|f| whitespace_terms(&ws(f), text))
                .collect::<Result<Vec<_>>>()?,
        ),
        DynamicValue::Boolean(_) | DynamicValue::Uuid(_) => Query::any(
            names
                .iter()
                .map(|f| Query::term(ws(f), leaf.to_string()))
                .collect(),
        ),
        DynamicValue::Nid(nid) => {
            let mut clauses: Vec<Query> = names
                .iter()
                .map(|f| Query::term(ws(f), nid.to_string()))
                .collect();
            if nid_mode == NidQueryMode::Dual {
                clauses.push(point_query(names, &DynamicValue::Integer(nid.as_i32()))?);
            }
            Query::any(clauses)
        }
        DynamicValue::Integer(v) => integral_clause(names, leaf, *v as i64, nid_mode)?,
        DynamicValue::Long(v) => integral_clause(names, leaf, *v, nid_mode)?,
        DynamicValue::Float(_) | DynamicValue::Double(_) => point_query(names, leaf)?,
        DynamicValue::ByteArray(_) => return Err(Error::NotIndexable(DynamicDataType::ByteArray)),
        // flatten() never yields arrays
        DynamicValue::Array(_) => return Err(Error::Internal("nested array leaf".into())),
    };
    Ok(clause)
}

/// Point probes, plus the whitespace term while nids may be stored as numbers
fn integral_clause(
    names: &[String],
    leaf: &DynamicValue,
    raw: i64,
    nid_mode: NidQueryMode,
) -> Result<Query> {
    let mut clauses = vec![point_query(names, leaf)?];
    if nid_mode == NidQueryMode::Dual && Nid::is_nid_shaped(raw) {
        clauses.extend(
            names
                .iter()
                .map(|f| Query::term(fields::whitespace(f), raw.to_string())),
        );
    }
    Ok(Query::any(clauses))
}
