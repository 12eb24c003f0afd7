use proptest::prelude::*;
use sheetform_common::{CellRange, CellReference};
use sheetform_store::RangeStore;

fn cell(column: u32, row: u32) -> CellReference {
    CellReference::from_coords(column, row).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Add(CellRange, u8),
    Remove(CellRange, u8),
    Replace(CellRange, u8, u8),
    Delete(CellRange),
}

fn range() -> impl Strategy<Value = CellRange> {
    (0u32..6, 0u32..6, 0u32..6, 0u32..6)
        .prop_map(|(c1, r1, c2, r2)| CellRange::new(cell(c1, r1), cell(c2, r2)))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (range(), 0u8..4).prop_map(|(r, v)| Op::Add(r, v)),
        1 => (range(), 0u8..4).prop_map(|(r, v)| Op::Remove(r, v)),
        1 => (range(), 0u8..4, 0u8..4).prop_map(|(r, new, old)| Op::Replace(r, new, old)),
        1 => range().prop_map(Op::Delete),
    ]
}

/// Brute-force model: every (range, value) pair.
fn apply(model: &mut Vec<(CellRange, u8)>, op: &Op) {
    match *op {
        Op::Add(range, value) => {
            if !model.contains(&(range, value)) {
                model.push((range, value));
            }
        }
        Op::Remove(range, value) => model.retain(|pair| *pair != (range, value)),
        Op::Replace(range, new, old) => {
            if new != old && model.contains(&(range, old)) {
                model.retain(|pair| *pair != (range, old));
                if !model.contains(&(range, new)) {
                    model.push((range, new));
                }
            }
        }
        Op::Delete(range) => model.retain(|(r, _)| *r != range),
    }
}

proptest! {
    #[test]
    fn indices_agree_with_brute_force(ops in prop::collection::vec(op(), 1..40)) {
        let mut store = RangeStore::new();
        let mut model = Vec::new();
        for op in &ops {
            match *op {
                Op::Add(range, value) => { store.add_value(range, value); }
                Op::Remove(range, value) => { store.remove_value(range, &value); }
                Op::Replace(range, new, old) => { store.replace_value(range, new, &old); }
                Op::Delete(range) => { store.delete(range); }
            }
            apply(&mut model, op);
        }

        for column in 0..7 {
            for row in 0..7 {
                let cell = cell(column, row);
                let mut expected: Vec<CellRange> = model
                    .iter()
                    .map(|(range, _)| *range)
                    .filter(|range| range.contains(cell))
                    .collect();
                expected.sort();
                expected.dedup();
                prop_assert_eq!(store.load_cell_reference_ranges(cell), expected);
            }
        }

        for value in 0u8..4 {
            let mut expected: Vec<CellRange> = model
                .iter()
                .filter(|(_, v)| *v == value)
                .map(|(range, _)| *range)
                .collect();
            let mut actual = store.ranges_with_value(&value);
            expected.sort();
            actual.sort();
            prop_assert_eq!(actual, expected);
        }

        let mut ids = store.ids(0, usize::MAX);
        let total = store.values(0, usize::MAX).len();
        prop_assert_eq!(total, model.len());
        ids.dedup();
        prop_assert_eq!(ids.len(), store.len());
    }
}

#[test]
fn absolute_and_relative_lookups_match() {
    let mut store = RangeStore::new();
    store.add_value(CellRange::parse("$B$2:$D$4").unwrap(), "block");
    for text in ["C3", "$C$3", "C$3", "$C3"] {
        let cell = CellReference::parse(text).unwrap();
        assert_eq!(store.load_cell_reference_values(cell), vec!["block"], "{text}");
    }
}
