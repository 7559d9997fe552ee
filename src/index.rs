use crate::errors::DbError;
use crate::query::{Order, get_path};
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Key pattern of an index, in declaration order: `{ author: 1, published_year: -1 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub keys: Vec<(String, Order)>,
}

impl IndexSpec {
    /// # Errors
    /// Returns an error if the key document is empty or a direction is not `1`/`-1`.
    pub fn from_document(keys: &BsonDocument) -> Result<Self, DbError> {
        if keys.is_empty() {
            return Err(DbError::query("index key pattern must not be empty"));
        }
        let mut out = Vec::with_capacity(keys.len());
        for (field, dir) in keys {
            let order = match dir {
                Bson::Int32(1) | Bson::Int64(1) => Order::Asc,
                Bson::Int32(-1) | Bson::Int64(-1) => Order::Desc,
                Bson::Double(d) if (*d - 1.0).abs() < f64::EPSILON => Order::Asc,
                Bson::Double(d) if (*d + 1.0).abs() < f64::EPSILON => Order::Desc,
                other => {
                    return Err(DbError::query(format!(
                        "index direction for '{field}' must be 1 or -1, got {other}"
                    )));
                }
            };
            out.push((field.clone(), order));
        }
        Ok(Self { keys: out })
    }

    /// `title_1`, `author_1_published_year_-1`.
    #[must_use]
    pub fn default_name(&self) -> String {
        self.keys
            .iter()
            .map(|(f, o)| format!("{f}_{}", o.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    #[must_use]
    pub fn key_pattern(&self) -> BsonDocument {
        let mut d = BsonDocument::new();
        for (f, o) in &self.keys {
            d.insert(f.clone(), o.as_i32());
        }
        d
    }

    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.keys.iter().map(|(f, _)| f.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub keys: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub build_time_ms: u128,
}

/// Scalar component of an index key. Numbers collapse to one variant so that
/// `15`, `15i64` and `15.0` land on the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexKey {
    Null,
    Num(OrderedFloat<f64>),
    Str(String),
    Bool(bool),
}

#[must_use]
pub fn key_from_bson(v: Option<&Bson>) -> Option<IndexKey> {
    match v {
        None | Some(Bson::Null) => Some(IndexKey::Null),
        Some(Bson::String(s)) => Some(IndexKey::Str(s.clone())),
        Some(Bson::Int32(i)) => Some(IndexKey::Num(OrderedFloat(f64::from(*i)))),
        #[allow(clippy::cast_precision_loss)]
        Some(Bson::Int64(i)) => Some(IndexKey::Num(OrderedFloat(*i as f64))),
        Some(Bson::Double(f)) => Some(IndexKey::Num(OrderedFloat(*f))),
        Some(Bson::Boolean(b)) => Some(IndexKey::Bool(*b)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart(IndexKey, Order);

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = self.0.cmp(&other.0);
        if self.1 == Order::Desc { ord.reverse() } else { ord }
    }
}

/// Result of an index probe.
#[derive(Debug, Clone, Default)]
pub struct IndexScan {
    pub ids: Vec<DocumentId>,
    pub keys_examined: usize,
}

#[derive(Debug, Clone)]
pub struct BTreeIndex {
    pub name: String,
    pub spec: IndexSpec,
    map: BTreeMap<Vec<KeyPart>, BTreeSet<DocumentId>>,
    // documents with a value we cannot key (arrays, subdocuments, ...)
    unkeyed: BTreeSet<DocumentId>,
    pub stats: IndexStats,
}

impl BTreeIndex {
    #[must_use]
    pub fn new(name: String, spec: IndexSpec) -> Self {
        Self {
            name,
            spec,
            map: BTreeMap::new(),
            unkeyed: BTreeSet::new(),
            stats: IndexStats::default(),
        }
    }

    fn key_for(&self, doc: &BsonDocument) -> Option<Vec<KeyPart>> {
        self.spec
            .keys
            .iter()
            .map(|(field, order)| key_from_bson(get_path(doc, field)).map(|k| KeyPart(k, *order)))
            .collect()
    }

    pub fn insert(&mut self, doc: &BsonDocument, id: &DocumentId) {
        let inserted = match self.key_for(doc) {
            Some(key) => self.map.entry(key).or_default().insert(id.clone()),
            None => self.unkeyed.insert(id.clone()),
        };
        if inserted {
            self.stats.entries += 1;
        }
        self.stats.keys = self.map.len();
    }

    pub fn remove(&mut self, doc: &BsonDocument, id: &DocumentId) {
        let removed = match self.key_for(doc) {
            Some(key) => {
                let removed = self.map.get_mut(&key).is_some_and(|set| set.remove(id));
                if self.map.get(&key).is_some_and(BTreeSet::is_empty) {
                    self.map.remove(&key);
                }
                removed
            }
            None => self.unkeyed.remove(id),
        };
        if removed {
            self.stats.entries = self.stats.entries.saturating_sub(1);
        }
        self.stats.keys = self.map.len();
    }

    /// Ids whose leading key components equal `values`. Unkeyed documents are
    /// always returned as candidates; the caller re-evaluates the filter.
    pub fn lookup_prefix_eq(&mut self, values: &[Bson]) -> Option<IndexScan> {
        if values.is_empty() || values.len() > self.spec.keys.len() {
            return None;
        }
        let mut prefix = Vec::with_capacity(values.len());
        for (v, (_, order)) in values.iter().zip(&self.spec.keys) {
            prefix.push(KeyPart(key_from_bson(Some(v))?, *order));
        }
        let mut scan = IndexScan::default();
        for (key, ids) in self.map.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            scan.keys_examined += ids.len();
            scan.ids.extend(ids.iter().cloned());
        }
        scan.keys_examined += self.unkeyed.len();
        scan.ids.extend(self.unkeyed.iter().cloned());
        if scan.ids.is_empty() {
            self.stats.misses += 1;
        } else {
            self.stats.hits += 1;
        }
        Some(scan)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    pub key: BsonDocument,
}

/// Indexes of one collection, kept in creation order.
#[derive(Debug, Default)]
pub struct IndexManager {
    pub indexes: Vec<BTreeIndex>,
}

impl IndexManager {
    #[must_use]
    pub fn new() -> Self {
        Self { indexes: Vec::new() }
    }

    /// Registers an empty index. Returns `Ok(false)` when an identical index already exists.
    ///
    /// # Errors
    /// Returns `IndexConflict` when the name is taken by a different key pattern.
    pub fn create_index(&mut self, name: &str, spec: IndexSpec) -> Result<bool, DbError> {
        if let Some(existing) = self.get(name) {
            if existing.spec == spec {
                return Ok(false);
            }
            return Err(DbError::IndexConflict(format!(
                "index '{name}' already exists with a different key pattern"
            )));
        }
        self.indexes.push(BTreeIndex::new(name.to_string(), spec));
        Ok(true)
    }

    pub fn drop_index(&mut self, name: &str) -> bool {
        let before = self.indexes.len();
        self.indexes.retain(|i| i.name != name);
        before != self.indexes.len()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BTreeIndex> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BTreeIndex> {
        self.indexes.iter_mut().find(|i| i.name == name)
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<IndexDescriptor> {
        self.indexes
            .iter()
            .map(|i| IndexDescriptor { name: i.name.clone(), key: i.spec.key_pattern() })
            .collect()
    }
}

pub fn index_insert_all(mgr: &mut IndexManager, doc: &BsonDocument, id: &DocumentId) {
    for idx in &mut mgr.indexes {
        idx.insert(doc, id);
    }
}

pub fn index_remove_all(mgr: &mut IndexManager, doc: &BsonDocument, id: &DocumentId) {
    for idx in &mut mgr.indexes {
        idx.remove(doc, id);
    }
}
