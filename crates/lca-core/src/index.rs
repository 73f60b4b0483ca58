//! Bidirectional key/position indices for the matrix rows and columns.
//!
//! Positions are assigned append-only: the first key put into an index gets
//! position 0, the next new key position 1, and so on. A position never
//! changes once assigned and keys are never removed, so a position handed
//! out during matrix assembly stays valid for the lifetime of the index.
//!
//! ```text
//! key ──positions──▶ position      position ──keys──▶ key
//!       O(1) hash                        O(1) vec
//! ```

use hashbrown::HashMap;
use std::hash::Hash;

use crate::{FlowId, ImpactId, TechFlow};

/// Ordered set of unique keys with O(1) lookup in both directions.
#[derive(Debug, Clone)]
pub struct Index<K> {
    keys: Vec<K>,
    positions: HashMap<K, usize>,
}

impl<K: Clone + Eq + Hash> Index<K> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Adds the key if it is not yet present and returns its position.
    pub fn put(&mut self, key: K) -> usize {
        if let Some(&pos) = self.positions.get(&key) {
            return pos;
        }
        let pos = self.keys.len();
        self.positions.insert(key.clone(), pos);
        self.keys.push(key);
        pos
    }

    /// Position of the key, `None` if it was never added.
    pub fn position(&self, key: &K) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Key stored at the given position.
    pub fn key_at(&self, position: usize) -> Option<&K> {
        self.keys.get(position)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in position order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &K)> + '_ {
        self.keys.iter().enumerate()
    }
}

impl<K: Clone + Eq + Hash> Default for Index<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash> FromIterator<K> for Index<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut index = Index::new();
        for key in iter {
            index.put(key);
        }
        index
    }
}

/// Index of the technology entries (rows and columns of `A`).
///
/// Carries the reference entry and the demanded amount of it. The reference
/// entry is always part of the index.
#[derive(Debug, Clone)]
pub struct TechIndex {
    index: Index<TechFlow>,
    reference: TechFlow,
    demand: f64,
}

impl TechIndex {
    /// Creates the index with the reference entry at position 0.
    pub fn new(reference: TechFlow, demand: f64) -> Self {
        let mut index = Index::new();
        index.put(reference);
        Self {
            index,
            reference,
            demand,
        }
    }

    pub fn put(&mut self, entry: TechFlow) -> usize {
        self.index.put(entry)
    }

    pub fn position(&self, entry: &TechFlow) -> Option<usize> {
        self.index.position(entry)
    }

    pub fn key_at(&self, position: usize) -> Option<&TechFlow> {
        self.index.key_at(position)
    }

    pub fn contains(&self, entry: &TechFlow) -> bool {
        self.index.contains(entry)
    }

    pub fn size(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn reference(&self) -> TechFlow {
        self.reference
    }

    /// Matrix position of the reference entry.
    pub fn reference_position(&self) -> usize {
        // the constructor puts the reference entry; it can never be missing
        self.index.position(&self.reference).unwrap_or(0)
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn set_demand(&mut self, demand: f64) {
        self.demand = demand;
    }

    pub fn entries(&self) -> &[TechFlow] {
        self.index.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TechFlow)> + '_ {
        self.index.iter()
    }

    /// New index holding only the entries at the given positions, in the
    /// given order. The reference entry must be among them.
    pub(crate) fn retain_positions(&self, positions: &[usize]) -> Self {
        let mut retained = TechIndex::new(self.reference, self.demand);
        for &pos in positions {
            if let Some(entry) = self.index.key_at(pos) {
                retained.put(*entry);
            }
        }
        retained
    }
}

/// Index of the elementary flows (rows of `B`, columns of `C`).
///
/// Each flow is flagged as an input (resource taken from the environment)
/// or an output (emission). Result accessors use the flag to present input
/// amounts as positive values.
#[derive(Debug, Clone, Default)]
pub struct FlowIndex {
    index: Index<FlowId>,
    inputs: Vec<bool>,
}

impl FlowIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_input(&mut self, flow: FlowId) -> usize {
        self.put(flow, true)
    }

    pub fn put_output(&mut self, flow: FlowId) -> usize {
        self.put(flow, false)
    }

    /// Adds the flow with the given direction. The direction of a flow that
    /// is already present is not changed.
    pub fn put(&mut self, flow: FlowId, is_input: bool) -> usize {
        let pos = self.index.put(flow);
        if pos == self.inputs.len() {
            self.inputs.push(is_input);
        }
        pos
    }

    pub fn position(&self, flow: &FlowId) -> Option<usize> {
        self.index.position(flow)
    }

    pub fn key_at(&self, position: usize) -> Option<&FlowId> {
        self.index.key_at(position)
    }

    pub fn contains(&self, flow: &FlowId) -> bool {
        self.index.contains(flow)
    }

    /// `false` for flows that are not in the index.
    pub fn is_input(&self, flow: &FlowId) -> bool {
        self.index
            .position(flow)
            .map(|pos| self.inputs[pos])
            .unwrap_or(false)
    }

    pub fn is_input_at(&self, position: usize) -> bool {
        self.inputs.get(position).copied().unwrap_or(false)
    }

    pub fn size(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn flows(&self) -> &[FlowId] {
        self.index.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FlowId, bool)> + '_ {
        self.index
            .iter()
            .map(move |(pos, flow)| (pos, flow, self.inputs[pos]))
    }

    pub(crate) fn retain_positions(&self, positions: &[usize]) -> Self {
        let mut retained = FlowIndex::new();
        for &pos in positions {
            if let Some(flow) = self.index.key_at(pos) {
                retained.put(*flow, self.inputs[pos]);
            }
        }
        retained
    }
}

/// Index of the impact categories (rows of `C`).
pub type ImpactIndex = Index<ImpactId>;

impl ImpactIndex {
    pub(crate) fn retain_positions(&self, positions: &[usize]) -> Self {
        positions
            .iter()
            .filter_map(|&pos| self.key_at(pos).copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProcessId;

    fn tech(process: u64, flow: u64) -> TechFlow {
        TechFlow::new(ProcessId::new(process), FlowId::new(flow))
    }

    #[test]
    fn put_returns_existing_position() {
        let mut index = Index::new();
        assert_eq!(index.put("a"), 0);
        assert_eq!(index.put("b"), 1);
        assert_eq!(index.put("a"), 0);
        assert_eq!(index.size(), 2);
        assert_eq!(index.key_at(1), Some(&"b"));
        assert_eq!(index.position(&"c"), None);
        assert_eq!(index.key_at(5), None);
    }

    #[test]
    fn positions_are_stable_in_insertion_order() {
        let index: Index<u32> = [5, 3, 5, 9, 3].into_iter().collect();
        assert_eq!(index.keys(), &[5, 3, 9]);
        for (pos, key) in index.iter() {
            assert_eq!(index.position(key), Some(pos));
        }
    }

    #[test]
    fn tech_index_reference_is_first() {
        let mut index = TechIndex::new(tech(1, 1), 10.0);
        index.put(tech(2, 2));
        index.put(tech(1, 1));
        assert_eq!(index.size(), 2);
        assert_eq!(index.reference_position(), 0);
        assert_eq!(index.demand(), 10.0);
        assert_eq!(index.reference(), tech(1, 1));
    }

    #[test]
    fn flow_index_keeps_first_direction() {
        let mut index = FlowIndex::new();
        let co2 = FlowId::new(1);
        let oil = FlowId::new(2);
        index.put_output(co2);
        index.put_input(oil);
        index.put_input(co2);
        assert!(!index.is_input(&co2));
        assert!(index.is_input(&oil));
        assert!(!index.is_input(&FlowId::new(99)));
        assert_eq!(index.size(), 2);
    }

    #[test]
    fn retain_positions_keeps_reference_and_order() {
        let mut index = TechIndex::new(tech(1, 1), 2.0);
        index.put(tech(2, 2));
        index.put(tech(3, 3));
        let retained = index.retain_positions(&[0, 2]);
        assert_eq!(retained.size(), 2);
        assert_eq!(retained.position(&tech(3, 3)), Some(1));
        assert_eq!(retained.reference_position(), 0);
        assert_eq!(retained.demand(), 2.0);
    }
}
