//! Request-scoped storage for calculation results.
//!
//! A caller that serves several queries against the same result (totals,
//! contributions, tree expansions) keeps it here under a generated id and
//! drops it when done. The cache is an ordinary value owned by the caller;
//! nothing in this crate keeps results alive globally.

use hashbrown::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::result::CalculationResult;

#[derive(Debug, Default)]
pub struct ResultCache {
    results: HashMap<Uuid, CalculationResult>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `result` under a fresh id.
    pub fn put(&mut self, result: CalculationResult) -> Uuid {
        let id = Uuid::new_v4();
        debug!(%id, kind = result.kind().as_str(), "cached result");
        self.results.insert(id, result);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&CalculationResult> {
        self.results.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut CalculationResult> {
        self.results.get_mut(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.results.contains_key(id)
    }

    /// Removes and returns the result stored under `id`.
    pub fn pop(&mut self, id: &Uuid) -> Option<CalculationResult> {
        let result = self.results.remove(id);
        if result.is_some() {
            debug!(%id, "disposed result");
        }
        result
    }

    pub fn ids(&self) -> impl Iterator<Item = &Uuid> + '_ {
        self.results.keys()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}
