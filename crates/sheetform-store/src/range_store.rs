use std::collections::BTreeMap;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use sheetform_common::{CellRange, CellReference};

use crate::watchers::{WatcherId, Watchers};

/// Values attached to cell ranges.
///
/// ## Layout
///
/// Two sorted corner indices and one reverse index:
/// - `top_left`: begin corner to the ranges starting there
/// - `bottom_right`: end corner to the ranges ending there
/// - `value_ranges`: value to every range holding it
///
/// A range containing a cell starts at or before it and ends at or after it
/// in row-major order, so point lookups walk each corner index from the cell
/// outwards and never touch the other half of either map.
#[derive(Debug)]
pub struct RangeStore<V: Clone + Eq + Hash> {
    top_left: BTreeMap<CellReference, Vec<RangeNode<V>>>,
    bottom_right: BTreeMap<CellReference, Vec<RangeNode<V>>>,
    value_ranges: FxHashMap<V, Vec<CellRange>>,
    delete_watchers: Watchers<CellRange>,
}

/// One range under a corner, with its values in insertion order.
#[derive(Debug, Clone)]
struct RangeNode<V> {
    range: CellRange,
    values: Vec<V>,
}

type CornerIndex<V> = BTreeMap<CellReference, Vec<RangeNode<V>>>;

fn node<'a, V>(
    index: &'a CornerIndex<V>,
    corner: &CellReference,
    range: CellRange,
) -> Option<&'a RangeNode<V>> {
    index
        .get(corner)
        .and_then(|nodes| nodes.iter().find(|n| n.range == range))
}

fn node_mut<'a, V>(
    index: &'a mut CornerIndex<V>,
    corner: &CellReference,
    range: CellRange,
) -> Option<&'a mut RangeNode<V>> {
    index
        .get_mut(corner)
        .and_then(|nodes| nodes.iter_mut().find(|n| n.range == range))
}

fn insert<V: PartialEq>(
    index: &mut CornerIndex<V>,
    corner: CellReference,
    range: CellRange,
    value: V,
) -> bool {
    let nodes = index.entry(corner).or_default();
    match nodes.iter_mut().find(|n| n.range == range) {
        Some(node) if node.values.contains(&value) => false,
        Some(node) => {
            node.values.push(value);
            true
        }
        None => {
            nodes.push(RangeNode {
                range,
                values: vec![value],
            });
            true
        }
    }
}

fn remove<V: PartialEq>(
    index: &mut CornerIndex<V>,
    corner: CellReference,
    range: CellRange,
    value: &V,
) -> bool {
    let Some(nodes) = index.get_mut(&corner) else {
        return false;
    };
    let Some(node) = nodes.iter_mut().find(|n| n.range == range) else {
        return false;
    };
    let before = node.values.len();
    node.values.retain(|v| v != value);
    let removed = node.values.len() != before;
    if node.values.is_empty() {
        nodes.retain(|n| n.range != range);
    }
    if nodes.is_empty() {
        index.remove(&corner);
    }
    removed
}

fn replace<V: Clone + PartialEq>(
    index: &mut CornerIndex<V>,
    corner: &CellReference,
    range: CellRange,
    new: &V,
    old: &V,
) {
    if let Some(node) = node_mut(index, corner, range) {
        if node.values.contains(new) {
            node.values.retain(|v| v != old);
        } else if let Some(slot) = node.values.iter_mut().find(|v| **v == *old) {
            *slot = new.clone();
        }
    }
}

impl<V: Clone + Eq + Hash> Default for RangeStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Eq + Hash> RangeStore<V> {
    pub fn new() -> Self {
        Self {
            top_left: BTreeMap::new(),
            bottom_right: BTreeMap::new(),
            value_ranges: FxHashMap::default(),
            delete_watchers: Watchers::new(),
        }
    }

    /// Number of distinct ranges holding at least one value.
    pub fn len(&self) -> usize {
        self.top_left.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.top_left.is_empty()
    }

    /// Attach `value` to `range`. Returns false if it was already there.
    pub fn add_value(&mut self, range: CellRange, value: V) -> bool {
        if !insert(&mut self.top_left, range.begin(), range, value.clone()) {
            return false;
        }
        insert(&mut self.bottom_right, range.end(), range, value.clone());
        let ranges = self.value_ranges.entry(value).or_default();
        if !ranges.contains(&range) {
            ranges.push(range);
        }
        true
    }

    /// Values stored under exactly `range`.
    pub fn load(&self, range: CellRange) -> &[V] {
        node(&self.top_left, &range.begin(), range).map_or(&[], |n| n.values.as_slice())
    }

    /// Every stored range containing `cell`, sorted.
    pub fn load_cell_reference_ranges(&self, cell: CellReference) -> Vec<CellRange> {
        let cell = cell.to_relative();
        let mut starts = self.top_left.range(..=cell).rev();
        let mut ends = self.bottom_right.range(cell..);
        let mut from_starts = Vec::new();
        let mut from_ends = Vec::new();

        // Both walks see every containing range, so the first to finish wins.
        let mut ranges = loop {
            match starts.next() {
                Some((_, nodes)) => collect_containing(nodes, cell, &mut from_starts),
                None => break from_starts,
            }
            match ends.next() {
                Some((_, nodes)) => collect_containing(nodes, cell, &mut from_ends),
                None => break from_ends,
            }
        };
        ranges.sort();
        ranges
    }

    /// Values of every stored range containing `cell`, without duplicates.
    pub fn load_cell_reference_values(&self, cell: CellReference) -> Vec<V> {
        let mut values: Vec<V> = Vec::new();
        for range in self.load_cell_reference_ranges(cell) {
            for value in self.load(range) {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        values
    }

    /// Swap `old` for `new` under `range`.
    ///
    /// Returns false without touching anything when the values are equal or
    /// when any index is missing `old` for this range.
    pub fn replace_value(&mut self, range: CellRange, new: V, old: &V) -> bool {
        if new == *old {
            return false;
        }
        let present = self
            .value_ranges
            .get(old)
            .is_some_and(|ranges| ranges.contains(&range))
            && node(&self.top_left, &range.begin(), range)
                .is_some_and(|n| n.values.contains(old))
            && node(&self.bottom_right, &range.end(), range)
                .is_some_and(|n| n.values.contains(old));
        if !present {
            return false;
        }

        replace(&mut self.top_left, &range.begin(), range, &new, old);
        replace(&mut self.bottom_right, &range.end(), range, &new, old);
        self.forget_range(old, range);
        let ranges = self.value_ranges.entry(new).or_default();
        if !ranges.contains(&range) {
            ranges.push(range);
        }
        true
    }

    /// Detach one value from `range`, dropping the range once it holds nothing.
    pub fn remove_value(&mut self, range: CellRange, value: &V) -> bool {
        if !remove(&mut self.top_left, range.begin(), range, value) {
            return false;
        }
        remove(&mut self.bottom_right, range.end(), range, value);
        self.forget_range(value, range);
        true
    }

    /// Remove `range` with all its values and notify delete watchers.
    ///
    /// Watchers fire only when the range was present.
    pub fn delete(&mut self, range: CellRange) -> Vec<V> {
        let Some(values) = take(&mut self.top_left, range.begin(), range) else {
            return Vec::new();
        };
        take(&mut self.bottom_right, range.end(), range);
        for value in &values {
            self.forget_range(value, range);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            range = %range,
            values = values.len(),
            watchers = self.delete_watchers.len(),
            "range deleted"
        );

        self.delete_watchers.accept(&range);
        values
    }

    /// Register a callback run with each deleted range.
    pub fn add_delete_watcher(
        &mut self,
        watcher: impl Fn(&CellRange) + Send + Sync + 'static,
    ) -> WatcherId {
        self.delete_watchers.add(watcher)
    }

    pub fn remove_delete_watcher(&mut self, id: WatcherId) -> bool {
        self.delete_watchers.remove(id)
    }

    /// Ranges holding `value`, in the order they first received it.
    pub fn ranges_with_value(&self, value: &V) -> Vec<CellRange> {
        self.value_ranges.get(value).cloned().unwrap_or_default()
    }

    /// Up to `count` ranges, skipping the first `from`, ordered by begin
    /// corner and then by insertion under that corner.
    pub fn ids(&self, from: usize, count: usize) -> Vec<CellRange> {
        self.nodes().skip(from).take(count).map(|n| n.range).collect()
    }

    /// Up to `count` values, skipping the first `from`, in the same order as
    /// [`RangeStore::ids`] with each range's values in insertion order.
    pub fn values(&self, from: usize, count: usize) -> Vec<V> {
        self.nodes()
            .flat_map(|n| n.values.iter())
            .skip(from)
            .take(count)
            .cloned()
            .collect()
    }

    fn nodes(&self) -> impl Iterator<Item = &RangeNode<V>> {
        self.top_left.values().flatten()
    }

    fn forget_range(&mut self, value: &V, range: CellRange) {
        if let Some(ranges) = self.value_ranges.get_mut(value) {
            ranges.retain(|r| *r != range);
            if ranges.is_empty() {
                self.value_ranges.remove(value);
            }
        }
    }
}

fn collect_containing<V>(nodes: &[RangeNode<V>], cell: CellReference, out: &mut Vec<CellRange>) {
    out.extend(
        nodes
            .iter()
            .map(|n| n.range)
            .filter(|range| range.contains(cell)),
    );
}

fn take<V>(index: &mut CornerIndex<V>, corner: CellReference, range: CellRange) -> Option<Vec<V>> {
    let nodes = index.get_mut(&corner)?;
    let position = nodes.iter().position(|n| n.range == range)?;
    let node = nodes.remove(position);
    if nodes.is_empty() {
        index.remove(&corner);
    }
    Some(node.values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn range(text: &str) -> CellRange {
        CellRange::parse(text).unwrap()
    }

    fn cell(text: &str) -> CellReference {
        CellReference::parse(text).unwrap()
    }

    #[test]
    fn add_and_load_exact_range() {
        let mut store = RangeStore::new();
        assert!(store.add_value(range("A1:B2"), 1));
        assert!(store.add_value(range("A1:B2"), 2));
        assert!(!store.add_value(range("A1:B2"), 1));
        assert!(store.add_value(range("A1:C3"), 1));

        assert_eq!(store.load(range("A1:B2")), &[1, 2]);
        assert_eq!(store.load(range("B2:A1")), &[1, 2]);
        assert_eq!(store.load(range("A1:A1")), &[] as &[i32]);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.ranges_with_value(&1),
            vec![range("A1:B2"), range("A1:C3")]
        );
    }

    #[test]
    fn anchors_do_not_split_keys() {
        let mut store = RangeStore::new();
        store.add_value(range("$A$1:$B$2"), "x");
        assert_eq!(store.load(range("A1:B2")), &["x"]);
        assert_eq!(
            store.load_cell_reference_ranges(cell("$B$2")),
            vec![range("A1:B2")]
        );
    }

    #[test]
    fn cell_lookup_finds_containing_ranges() {
        let mut store = RangeStore::new();
        store.add_value(range("A1:C3"), "big");
        store.add_value(range("B2:B2"), "point");
        store.add_value(range("B1:D2"), "wide");
        store.add_value(range("C3:D4"), "corner");
        store.add_value(range("E5:F6"), "far");

        assert_eq!(
            store.load_cell_reference_ranges(cell("B2")),
            vec![range("A1:C3"), range("B1:D2"), range("B2")]
        );
        assert_eq!(
            store.load_cell_reference_values(cell("C3")),
            vec!["big", "corner"]
        );
        assert!(store.load_cell_reference_ranges(cell("A5")).is_empty());
        assert!(store.load_cell_reference_ranges(cell("Z100")).is_empty());
    }

    #[test]
    fn replace_is_all_or_nothing() {
        let mut store = RangeStore::new();
        store.add_value(range("A1:B2"), 1);
        store.add_value(range("C1:C9"), 1);

        assert!(!store.replace_value(range("A1:B2"), 1, &1));
        assert!(!store.replace_value(range("A1:B2"), 3, &2));
        assert!(!store.replace_value(range("D1:D2"), 3, &1));
        assert_eq!(store.load(range("A1:B2")), &[1]);

        assert!(store.replace_value(range("A1:B2"), 3, &1));
        assert_eq!(store.load(range("A1:B2")), &[3]);
        assert_eq!(store.load_cell_reference_values(cell("B2")), vec![3]);
        assert_eq!(store.ranges_with_value(&1), vec![range("C1:C9")]);
        assert_eq!(store.ranges_with_value(&3), vec![range("A1:B2")]);
    }

    #[test]
    fn replace_onto_existing_value_merges() {
        let mut store = RangeStore::new();
        store.add_value(range("A1"), 1);
        store.add_value(range("A1"), 2);
        assert!(store.replace_value(range("A1"), 2, &1));
        assert_eq!(store.load(range("A1")), &[2]);
        assert!(store.ranges_with_value(&1).is_empty());
    }

    #[test]
    fn remove_drops_empty_ranges() {
        let mut store = RangeStore::new();
        store.add_value(range("A1:B2"), 1);
        store.add_value(range("A1:B2"), 2);

        assert!(store.remove_value(range("A1:B2"), &1));
        assert!(!store.remove_value(range("A1:B2"), &1));
        assert_eq!(store.load(range("A1:B2")), &[2]);

        assert!(store.remove_value(range("A1:B2"), &2));
        assert!(store.is_empty());
        assert!(store.load_cell_reference_ranges(cell("A1")).is_empty());
        assert!(store.ranges_with_value(&2).is_empty());
    }

    #[test]
    fn delete_fires_watchers() {
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let mut store = RangeStore::new();
        let id = {
            let deleted = Arc::clone(&deleted);
            store.add_delete_watcher(move |range| deleted.lock().unwrap().push(*range))
        };
        store.add_value(range("A1:B2"), 1);
        store.add_value(range("A1:B2"), 2);
        store.add_value(range("C3"), 3);

        assert_eq!(store.delete(range("A1:B2")), vec![1, 2]);
        assert!(store.delete(range("A1:B2")).is_empty());
        assert!(store.remove_delete_watcher(id));
        store.delete(range("C3"));

        assert_eq!(*deleted.lock().unwrap(), vec![range("A1:B2")]);
        assert!(store.is_empty());
    }

    #[test]
    fn pagination_follows_begin_corner_order() {
        let mut store = RangeStore::new();
        store.add_value(range("B2:C3"), "b");
        store.add_value(range("A1:A5"), "a1");
        store.add_value(range("A1:D1"), "a2");
        store.add_value(range("A1:D1"), "a3");
        store.add_value(range("A2"), "c");

        assert_eq!(
            store.ids(0, 10),
            vec![range("A1:A5"), range("A1:D1"), range("A2"), range("B2:C3")]
        );
        assert_eq!(store.ids(1, 2), vec![range("A1:D1"), range("A2")]);
        assert_eq!(store.values(1, 3), vec!["a2", "a3", "c"]);
        assert!(store.values(9, 3).is_empty());
    }
}
