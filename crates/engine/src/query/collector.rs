//! Hit resolution and result paging
//!
//! Every indexed document carries its component nid as a per-document value,
//! so resolving a hit is normally one lookup. Documents written without it
//! are resolved from the stored nid field or the document key instead; that
//! path is logged because it points at an index written by something other
//! than the current indexers.

use super::{QueryHit, QueryRequest};
use termstore_core::{Error, Nid, Result};
use termstore_search::{fields, Hit, SearchBackend};
use tracing::warn;

/// Nid of a matching document
///
/// `describe` supplies diagnostic text for a nid resolved on the fallback
/// path. With `strict`, any fallback is an error.
///
/// # Errors
///
/// `ResultResolution` if no nid can be recovered, or on fallback under `strict`.
pub fn resolve_hit(
    backend: &dyn SearchBackend,
    hit: Hit,
    strict: bool,
    describe: &dyn Fn(Nid) -> Option<String>,
) -> Result<Nid> {
    let reason = match backend.doc_value(hit.doc_id, fields::COMPONENT_NID) {
        Some(raw) => match i32::try_from(raw) {
            Ok(raw) => return Ok(Nid::new(raw)),
            Err(_) => format!("component nid value {} out of range", raw),
        },
        None => "component nid value missing".to_string(),
    };

    if strict {
        return Err(Error::ResultResolution {
            doc_id: hit.doc_id,
            reason,
        });
    }

    let nid = backend
        .stored(hit.doc_id, fields::COMPONENT_NID)
        .or_else(|| backend.key(hit.doc_id))
        .and_then(|s| s.parse::<i32>().ok())
        .map(Nid::new)
        .ok_or_else(|| Error::ResultResolution {
            doc_id: hit.doc_id,
            reason: format!("{}; no stored nid or numeric key", reason),
        })?;

    let assemblage = backend
        .stored(hit.doc_id, fields::ASSEMBLAGE)
        .unwrap_or_else(|| "?".to_string());
    let description = backend
        .stored(hit.doc_id, fields::DESCRIPTION_TEXT)
        .or_else(|| describe(nid))
        .unwrap_or_default();
    warn!(
        target: "termstore::query",
        doc_id = hit.doc_id,
        %nid,
        assemblage = %assemblage,
        description = %description,
        reason = %reason,
        "Resolved hit through the slow path"
    );
    Ok(nid)
}

/// Resolve, filter and page hits in score order
///
/// # Errors
///
/// As `resolve_hit`.
pub fn collect(
    backend: &dyn SearchBackend,
    hits: Vec<Hit>,
    request: &QueryRequest,
    default_limit: usize,
    strict: bool,
    describe: &dyn Fn(Nid) -> Option<String>,
) -> Result<Vec<QueryHit>> {
    let limit = request.limit.unwrap_or(default_limit);
    let mut results = Vec::new();
    let mut skipped = 0;
    for hit in hits {
        if results.len() >= limit {
            break;
        }
        let nid = resolve_hit(backend, hit, strict, describe)?;
        if let Some(allowed) = &request.restrict_to {
            if !allowed.contains(&nid) {
                continue;
            }
        }
        if let Some(filter) = &request.filter {
            if !filter(nid) {
                continue;
            }
        }
        if skipped < request.offset {
            skipped += 1;
            continue;
        }
        results.push(QueryHit {
            nid,
            score: hit.score,
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use termstore_search::{Analyzer, IndexDocument, IndexField, InMemoryIndex, Query};

    fn doc(key: &str, nid: Option<i64>, stored: Option<&str>) -> IndexDocument {
        let mut d = IndexDocument::new(key);
        d.add(IndexField::text("colData", "match", Analyzer::Standard));
        if let Some(n) = nid {
            d.set_doc_value(fields::COMPONENT_NID, n);
        }
        if let Some(s) = stored {
            d.store(fields::COMPONENT_NID, s);
        }
        d
    }

    fn search(index: &InMemoryIndex) -> Vec<Hit> {
        index.search(&Query::term("colData", "match"))
    }

    fn no_description(_: Nid) -> Option<String> {
        None
    }

    #[test]
    fn test_fast_path() {
        let index = InMemoryIndex::new();
        index.upsert(doc("-5", Some(-5), None));
        let hit = search(&index)[0];
        assert_eq!(resolve_hit(&index, hit, true, &no_description).unwrap(), Nid::new(-5));
    }

    #[test]
    fn test_fallback_to_stored_then_key() {
        let index = InMemoryIndex::new();
        index.upsert(doc("k", None, Some("-6")));
        let hit = search(&index)[0];
        assert_eq!(resolve_hit(&index, hit, false, &no_description).unwrap(), Nid::new(-6));

        let index = InMemoryIndex::new();
        index.upsert(doc("-7", None, None));
        let hit = search(&index)[0];
        assert_eq!(resolve_hit(&index, hit, false, &no_description).unwrap(), Nid::new(-7));
    }

    #[test]
    fn test_strict_rejects_fallback() {
        let index = InMemoryIndex::new();
        index.upsert(doc("-7", None, None));
        let hit = search(&index)[0];
        let err = resolve_hit(&index, hit, true, &no_description).unwrap_err();
        assert!(matches!(err, Error::ResultResolution { .. }));
    }

    #[test]
    fn test_unresolvable() {
        let index = InMemoryIndex::new();
        index.upsert(doc("not-a-nid", Some(i64::MAX), None));
        let hit = search(&index)[0];
        assert!(resolve_hit(&index, hit, false, &no_description).is_err());
    }

    #[test]
    fn test_filters_then_pages() {
        let index = InMemoryIndex::new();
        for n in 1..=6 {
            index.upsert(doc(&(-n).to_string(), Some(-n), None));
        }
        let hits = search(&index);
        let request = QueryRequest::text("match")
            .restrict_to((1..=5).map(|n| Nid::new(-n)))
            .filter(|nid| nid != Nid::new(-2))
            .page(1, 2);
        let results = collect(&index, hits, &request, 100, true, &no_description).unwrap();
        let nids: Vec<Nid> = results.iter().map(|r| r.nid).collect();
        // equal scores keep insertion order: -1 -2 -3 -4 -5 -6
        assert_eq!(nids, vec![Nid::new(-3), Nid::new(-4)]);
    }

    #[test]
    fn test_default_limit() {
        let index = InMemoryIndex::new();
        for n in 1..=5 {
            index.upsert(doc(&(-n).to_string(), Some(-n), None));
        }
        let request = QueryRequest::text("match");
        let results = collect(&index, search(&index), &request, 3, true, &no_description).unwrap();
        assert_eq!(results.len(), 3);
    }
}
