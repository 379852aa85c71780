//! In-memory search backend
//!
//! # Layout
//!
//! - Postings: `field \x1f term` → posting list, in a DashMap
//! - Term dictionary: ordered set of the same composite keys, for prefixes
//! - Points: `(field, kind)` → sortable value → doc ids, one BTreeMap each
//! - Documents: compact `u32` doc ids mapped to keys by `DocIdMap`; a
//!   replaced key keeps its doc id, a deleted key's id is released and never
//!   handed out again
//!
//! # Scoring
//!
//! Term clauses score with BM25 (k1 = 1.2, b = 0.75) against the global
//! average document length. Prefix, range and match-all clauses are constant
//! score 1.0. Boolean clauses add the scores of their matching sub-clauses.
//!
//! # Generation watermark
//!
//! `commit(g)` raises the applied generation with `fetch_max` semantics and
//! wakes waiters on a condition variable.

use crate::backend::{Hit, SearchBackend};
use crate::document::{FieldValue, IndexDocument, NumericKind};
use crate::query::{BoolQuery, Query};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;
const TERM_SEPARATOR: char = '\u{1f}';

fn composite(field: &str, term: &str) -> String {
    let mut key = String::with_capacity(field.len() + term.len() + 1);
    key.push_str(field);
    key.push(TERM_SEPARATOR);
    key.push_str(term);
    key
}

// ============================================================================
// PostingList
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct PostingEntry {
    doc_id: u32,
    tf: u32,
}

#[derive(Debug, Default)]
struct PostingList {
    entries: Vec<PostingEntry>,
}

impl PostingList {
    fn remove_by_id(&mut self, doc_id: u32) {
        self.entries.retain(|e| e.doc_id != doc_id);
    }
}

// ============================================================================
// DocIdMap
// ============================================================================

/// Bidirectional key ↔ u32 doc id mapping
///
/// Only called under the index write lock.
#[derive(Default)]
struct DocIdMap {
    id_to_key: DashMap<u32, String>,
    key_to_id: DashMap<String, u32>,
    next: AtomicU32,
}

impl DocIdMap {
    fn get_or_insert(&self, key: &str) -> u32 {
        if let Some(id) = self.key_to_id.get(key) {
            return *id;
        }
        let id = self.next.fetch_add(1, Ordering::AcqRel);
        self.id_to_key.insert(id, key.to_string());
        self.key_to_id.insert(key.to_string(), id);
        id
    }

    fn get(&self, key: &str) -> Option<u32> {
        self.key_to_id.get(key).map(|r| *r)
    }

    fn resolve(&self, doc_id: u32) -> Option<String> {
        self.id_to_key.get(&doc_id).map(|r| r.value().clone())
    }

    /// Forget a deleted document's id
    fn release(&self, doc_id: u32) {
        if let Some((_, key)) = self.id_to_key.remove(&doc_id) {
            self.key_to_id.remove(&key);
        }
    }

    fn clear(&self) {
        self.id_to_key.clear();
        self.key_to_id.clear();
    }
}

// ============================================================================
// InMemoryIndex
// ============================================================================

/// What a live document contributed, so it can be removed again
struct DocRecord {
    document: IndexDocument,
    terms: Vec<String>,
    points: Vec<(String, NumericKind, i64)>,
    len: u32,
}

/// Concurrent in-memory inverted index with typed numeric points
pub struct InMemoryIndex {
    postings: DashMap<String, PostingList>,
    term_dict: RwLock<BTreeSet<String>>,
    points: DashMap<(String, NumericKind), BTreeMap<i64, BTreeSet<u32>>>,
    docs: DashMap<u32, DocRecord>,
    doc_ids: DocIdMap,
    total_doc_len: AtomicUsize,
    /// Serializes writers so a replace is never interleaved with another write
    write_lock: Mutex<()>,
    applied: Mutex<u64>,
    advanced: Condvar,
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIndex {
    /// Empty index at generation 0
    pub fn new() -> Self {
        InMemoryIndex {
            postings: DashMap::new(),
            term_dict: RwLock::new(BTreeSet::new()),
            points: DashMap::new(),
            docs: DashMap::new(),
            doc_ids: DocIdMap::default(),
            total_doc_len: AtomicUsize::new(0),
            write_lock: Mutex::new(()),
            applied: Mutex::new(0),
            advanced: Condvar::new(),
        }
    }

    /// Number of distinct `(field, term)` pairs
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    fn avg_doc_len(&self) -> f32 {
        let docs = self.docs.len();
        if docs == 0 {
            return 1.0;
        }
        (self.total_doc_len.load(Ordering::Acquire) as f32 / docs as f32).max(1.0)
    }

    fn insert_locked(&self, document: IndexDocument) {
        let doc_id = self.doc_ids.get_or_insert(&document.key);
        self.remove_locked(doc_id);

        let mut tf: FxHashMap<String, u32> = FxHashMap::default();
        let mut points = Vec::new();
        for field in &document.fields {
            match &field.value {
                FieldValue::Text { text, analyzer } => {
                    for token in analyzer.tokens(text) {
                        *tf.entry(composite(&field.name, &token)).or_insert(0) += 1;
                    }
                }
                FieldValue::Numeric(value) => {
                    points.push((field.name.clone(), value.kind(), value.sortable()));
                }
            }
        }
        let len: u32 = tf.values().sum();

        {
            let mut dict = self.term_dict.write();
            for (term, count) in &tf {
                self.postings
                    .entry(term.clone())
                    .or_default()
                    .entries
                    .push(PostingEntry { doc_id, tf: *count });
                if !dict.contains(term) {
                    dict.insert(term.clone());
                }
            }
        }
        for (field, kind, value) in &points {
            self.points
                .entry((field.clone(), *kind))
                .or_default()
                .entry(*value)
                .or_default()
                .insert(doc_id);
        }

        self.total_doc_len.fetch_add(len as usize, Ordering::AcqRel);
        debug!(target: "termstore::index", key = %document.key, doc_id, terms = tf.len(), points = points.len(), "Indexed document");
        self.docs.insert(
            doc_id,
            DocRecord {
                document,
                terms: tf.into_keys().collect(),
                points,
                len,
            },
        );
    }

    fn remove_locked(&self, doc_id: u32) -> bool {
        let Some((_, record)) = self.docs.remove(&doc_id) else {
            return false;
        };
        let mut emptied = Vec::new();
        for term in &record.terms {
            if let Some(mut list) = self.postings.get_mut(term) {
                list.remove_by_id(doc_id);
                if list.entries.is_empty() {
                    emptied.push(term.clone());
                }
            }
        }
        if !emptied.is_empty() {
            let mut dict = self.term_dict.write();
            for term in emptied {
                self.postings.remove_if(&term, |_, list| list.entries.is_empty());
                dict.remove(&term);
            }
        }
        for (field, kind, value) in &record.points {
            if let Some(mut tree) = self.points.get_mut(&(field.clone(), *kind)) {
                if let Some(ids) = tree.get_mut(value) {
                    ids.remove(&doc_id);
                    if ids.is_empty() {
                        tree.remove(value);
                    }
                }
            }
        }
        self.total_doc_len
            .fetch_sub(record.len as usize, Ordering::AcqRel);
        true
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    fn eval(&self, query: &Query) -> FxHashMap<u32, f32> {
        match query {
            Query::Term { field, term } => self.eval_term(&composite(field, term)),
            Query::Prefix { field, prefix } => self.eval_prefix(&composite(field, prefix)),
            Query::Range(range) => {
                let mut out = FxHashMap::default();
                let Some((lower, upper)) = range.sortable_bounds() else {
                    return out;
                };
                if let Some(tree) = self.points.get(&(range.field().to_string(), range.kind())) {
                    for ids in tree.range((lower, upper)).map(|(_, ids)| ids) {
                        for id in ids {
                            out.insert(*id, 1.0);
                        }
                    }
                }
                out
            }
            Query::Bool(b) => self.eval_bool(b),
            Query::MatchAll => self.docs.iter().map(|e| (*e.key(), 1.0)).collect(),
        }
    }

    fn eval_term(&self, key: &str) -> FxHashMap<u32, f32> {
        let mut out = FxHashMap::default();
        let Some(list) = self.postings.get(key) else {
            return out;
        };
        let n = self.docs.len() as f32;
        let df = list.entries.len() as f32;
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        let avg = self.avg_doc_len();
        for entry in &list.entries {
            let len = self.docs.get(&entry.doc_id).map_or(0, |d| d.len) as f32;
            let tf = entry.tf as f32;
            let norm = tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * len / avg));
            out.insert(entry.doc_id, idf * norm);
        }
        out
    }

    fn eval_prefix(&self, key_prefix: &str) -> FxHashMap<u32, f32> {
        let terms: Vec<String> = self
            .term_dict
            .read()
            .range::<str, _>((Bound::Included(key_prefix), Bound::Unbounded))
            .take_while(|t| t.starts_with(key_prefix))
            .cloned()
            .collect();
        let mut out = FxHashMap::default();
        for term in terms {
            if let Some(list) = self.postings.get(&term) {
                for entry in &list.entries {
                    out.insert(entry.doc_id, 1.0);
                }
            }
        }
        out
    }

    fn eval_bool(&self, b: &BoolQuery) -> FxHashMap<u32, f32> {
        let mut acc: Option<FxHashMap<u32, f32>> = None;
        for clause in &b.must {
            let scores = self.eval(clause);
            acc = Some(match acc {
                None => scores,
                Some(prev) => prev
                    .into_iter()
                    .filter_map(|(id, s)| scores.get(&id).map(|t| (id, s + t)))
                    .collect(),
            });
        }
        let mut result = match acc {
            Some(required) => {
                let mut required = required;
                for clause in &b.should {
                    for (id, s) in self.eval(clause) {
                        if let Some(score) = required.get_mut(&id) {
                            *score += s;
                        }
                    }
                }
                required
            }
            None => {
                let mut any: FxHashMap<u32, f32> = FxHashMap::default();
                for clause in &b.should {
                    for (id, s) in self.eval(clause) {
                        *any.entry(id).or_insert(0.0) += s;
                    }
                }
                any
            }
        };
        if !b.must_not.is_empty() && !result.is_empty() {
            let mut excluded: FxHashSet<u32> = FxHashSet::default();
            for clause in &b.must_not {
                excluded.extend(self.eval(clause).into_keys());
            }
            result.retain(|id, _| !excluded.contains(id));
        }
        result
    }
}

impl SearchBackend for InMemoryIndex {
    fn upsert(&self, document: IndexDocument) {
        let _guard = self.write_lock.lock();
        self.insert_locked(document);
    }

    fn delete(&self, key: &str) -> bool {
        let _guard = self.write_lock.lock();
        let Some(doc_id) = self.doc_ids.get(key) else {
            return false;
        };
        let removed = self.remove_locked(doc_id);
        self.doc_ids.release(doc_id);
        removed
    }

    fn delete_by_term(&self, field: &str, term: &str) -> usize {
        let _guard = self.write_lock.lock();
        let ids: Vec<u32> = self
            .postings
            .get(&composite(field, term))
            .map(|list| list.entries.iter().map(|e| e.doc_id).collect())
            .unwrap_or_default();
        ids.into_iter()
            .filter(|id| {
                let removed = self.remove_locked(*id);
                self.doc_ids.release(*id);
                removed
            })
            .count()
    }

    fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.postings.clear();
        self.term_dict.write().clear();
        self.points.clear();
        self.docs.clear();
        self.doc_ids.clear();
        self.total_doc_len.store(0, Ordering::Release);
    }

    fn search(&self, query: &Query) -> Vec<Hit> {
        let mut hits: Vec<Hit> = self
            .eval(query)
            .into_iter()
            .filter(|(id, _)| self.docs.contains_key(id))
            .map(|(doc_id, score)| Hit { doc_id, score })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc_id.cmp(&b.doc_id))
        });
        hits
    }

    fn key(&self, doc_id: u32) -> Option<String> {
        self.doc_ids.resolve(doc_id)
    }

    fn doc_value(&self, doc_id: u32, field: &str) -> Option<i64> {
        self.docs
            .get(&doc_id)
            .and_then(|d| d.document.doc_values.get(field).copied())
    }

    fn stored(&self, doc_id: u32, field: &str) -> Option<String> {
        self.docs
            .get(&doc_id)
            .and_then(|d| d.document.stored.get(field).cloned())
    }

    fn document(&self, key: &str) -> Option<IndexDocument> {
        let doc_id = self.doc_ids.get(key)?;
        self.docs.get(&doc_id).map(|d| d.document.clone())
    }

    fn doc_count(&self) -> usize {
        self.docs.len()
    }

    fn commit(&self, generation: u64) {
        let mut applied = self.applied.lock();
        if generation > *applied {
            *applied = generation;
            self.advanced.notify_all();
        }
    }

    fn applied_generation(&self) -> u64 {
        *self.applied.lock()
    }

    fn wait_for_generation(&self, generation: u64, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut applied = self.applied.lock();
        while *applied < generation {
            match deadline {
                None => self.advanced.wait(&mut applied),
                Some(deadline) => {
                    if self.advanced.wait_until(&mut applied, deadline).timed_out() {
                        return *applied >= generation;
                    }
                }
            }
        }
        true
    }
}
