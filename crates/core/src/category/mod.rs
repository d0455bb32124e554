//! Two-level category hierarchy.
//!
//! The tree is loaded lazily from the store and kept as an immutable snapshot
//! until it expires or [`CategoryTree::invalidate`] is called. Readers share
//! the snapshot; a refresh replaces it wholesale.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::query::{Column, Predicate, ANY_CATEGORY};
use crate::store::{Category, ReleaseStore, StoreError};

/// Root of the movie categories.
pub const MOVIE_ROOT: i64 = 2000;
/// Last id of the movie range.
pub const MOVIE_OTHER: i64 = 2999;
/// Root of the TV categories.
pub const TV_ROOT: i64 = 5000;
/// Last id of the TV range.
pub const TV_OTHER: i64 = 5999;

/// Immutable view of the category table.
#[derive(Debug, Default)]
pub struct CategorySnapshot {
    categories: HashMap<i64, Category>,
    /// Parent id to its child ids, for parents that have children.
    children: BTreeMap<i64, BTreeSet<i64>>,
    concatenated: String,
}

impl CategorySnapshot {
    pub fn build(rows: Vec<Category>) -> Self {
        let categories: HashMap<i64, Category> = rows.into_iter().map(|c| (c.id, c)).collect();
        let mut children: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();

        for category in categories.values() {
            let Some(parent_id) = category.parent_id else {
                continue;
            };
            match categories.get(&parent_id) {
                Some(parent) if parent.parent_id.is_none() => {
                    children.entry(parent_id).or_default().insert(category.id);
                }
                _ => {
                    warn!(
                        category_id = category.id,
                        parent_id = parent_id,
                        "Ignoring category whose parent is missing or not a root"
                    );
                }
            }
        }

        let concatenated = children
            .iter()
            .flat_map(|(parent, kids)| kids.iter().map(move |kid| format!("{},{}", parent, kid)))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            categories,
            children,
            concatenated,
        }
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn children_of(&self, id: i64) -> Option<&BTreeSet<i64>> {
        self.children.get(&id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

struct Loaded {
    snapshot: Arc<CategorySnapshot>,
    expires_at: DateTime<Utc>,
}

/// Category hierarchy service injected into the query builder.
pub struct CategoryTree {
    store: Arc<dyn ReleaseStore>,
    ttl: Duration,
    loaded: RwLock<Option<Loaded>>,
}

impl CategoryTree {
    pub fn new(store: Arc<dyn ReleaseStore>, ttl_minutes: u32) -> Self {
        Self {
            store,
            ttl: Duration::minutes(i64::from(ttl_minutes)),
            loaded: RwLock::new(None),
        }
    }

    /// Current snapshot, reloading it when missing or expired.
    pub fn snapshot(&self) -> Result<Arc<CategorySnapshot>, StoreError> {
        let now = Utc::now();
        {
            let loaded = self.loaded.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(loaded) = loaded.as_ref() {
                if loaded.expires_at > now {
                    return Ok(Arc::clone(&loaded.snapshot));
                }
            }
        }

        let snapshot = Arc::new(CategorySnapshot::build(self.store.categories()?));
        debug!(categories = snapshot.len(), "Loaded category tree");

        let mut loaded = self.loaded.write().unwrap_or_else(PoisonError::into_inner);
        *loaded = Some(Loaded {
            snapshot: Arc::clone(&snapshot),
            expires_at: now + self.ttl,
        });
        Ok(snapshot)
    }

    /// Drop the snapshot; the next read reloads from the store.
    pub fn invalidate(&self) {
        *self.loaded.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Category filter for a set of ids.
    ///
    /// An empty set or the `-1` sentinel means no restriction. A parent id
    /// stands for all of its children; other ids are kept as given.
    pub fn resolve(&self, ids: &[i64]) -> Result<Predicate, StoreError> {
        let wanted: Vec<i64> = ids.iter().copied().filter(|id| *id != ANY_CATEGORY).collect();
        if wanted.is_empty() {
            return Ok(Predicate::True);
        }

        let snapshot = self.snapshot()?;
        let mut resolved = BTreeSet::new();
        for id in wanted {
            match snapshot.children_of(id) {
                Some(kids) => resolved.extend(kids.iter().copied()),
                None => {
                    resolved.insert(id);
                }
            }
        }

        Ok(Predicate::in_list(Column::CategoryId, resolved))
    }

    /// Every `parent,child` id pair, one per line.
    pub fn concatenated_ids(&self) -> Result<String, StoreError> {
        Ok(self.snapshot()?.concatenated.clone())
    }

    /// Parent of a category; a root is its own parent.
    pub fn parent_of(&self, id: i64) -> Result<Option<i64>, StoreError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.get(id).map(|c| c.parent_id.unwrap_or(c.id)))
    }
}
